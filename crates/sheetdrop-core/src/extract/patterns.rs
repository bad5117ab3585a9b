//! Generic fallback patterns, used only where no vendor mapping rule hits.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // Labeled fields
    pub static ref FALLBACK_INVOICE_NUMBER: Regex = Regex::new(
        r"(?i)Invoice Number[:\s]*(.+)"
    ).unwrap();

    pub static ref FALLBACK_INVOICE_DATE: Regex = Regex::new(
        r"(?i)Invoice Date[:\s]*(.+)"
    ).unwrap();

    // Amounts: optional currency symbol, thousands separators, up to two
    // decimal digits. A currency-prefixed match outranks any earlier bare
    // number in the text.
    pub static ref AMOUNT_WITH_CURRENCY: Regex = Regex::new(
        r"(?:₹|\$|€)\s*[0-9][0-9,]*(?:\.[0-9]{1,2})?"
    ).unwrap();

    pub static ref AMOUNT_BARE: Regex = Regex::new(
        r"[0-9][0-9,]*(?:\.[0-9]{1,2})?"
    ).unwrap();
}
