// file: src/repository/patterns.rs
// description: compiled regex patterns for file names and format headers
// reference: https://docs.rs/regex

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // Repository file names
    pub static ref FNAME_YEAR_RANGE: Regex = Regex::new(
        r"^([a-z0-9]+)_([a-z0-9@]+)_([a-z0-9]+)_([a-z0-9]+).*_(\d{4})_(\d{4})\..{3}"
    ).expect("FNAME_YEAR_RANGE regex is valid");

    pub static ref FNAME_SINGLE_YEAR: Regex = Regex::new(
        r"^([a-z0-9]+)_([a-z0-9@]+)_([a-z0-9]+)_([a-z0-9]+).*_(\d{4})\..{3}"
    ).expect("FNAME_SINGLE_YEAR regex is valid");

    pub static ref TRAILING_YEAR_RANGE: Regex = Regex::new(
        r"_(\d{4})_(\d{4})\.[A-Za-z0-9]+$"
    ).expect("TRAILING_YEAR_RANGE regex is valid");

    pub static ref TRAILING_SINGLE_YEAR: Regex = Regex::new(
        r"_(\d{4})\.[A-Za-z0-9]+$"
    ).expect("TRAILING_SINGLE_YEAR regex is valid");

    // Format headers
    pub static ref DMS1_FORMAT: Regex = Regex::new(
        r"^#\s?format\s?:\s?dwr-dms-1\.0"
    ).expect("DMS1_FORMAT regex is valid");

    pub static ref NCRO_PROVIDER: Regex = Regex::new(
        r"^#\s?provider\s?=\s?dwr-ncro"
    ).expect("NCRO_PROVIDER regex is valid");

    pub static ref DES_PROVIDER: Regex = Regex::new(
        r"^#\s?provider\s?[=:]\s?dwr-des"
    ).expect("DES_PROVIDER regex is valid");

    // Dates written as digit groups, e.g. 2009-03-31 14:00
    pub static ref DIGIT_GROUPS: Regex = Regex::new(
        r"\d+"
    ).expect("DIGIT_GROUPS regex is valid");
}
