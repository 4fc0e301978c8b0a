//! EMV tags consumed by the orchestration layer

use crate::Tag;

// Application selection
/// Application Identifier (AID) - card
pub const AID: Tag = Tag::new(0x4F);
/// Application Label
pub const APPLICATION_LABEL: Tag = Tag::new(0x50);
/// Application Preferred Name
pub const APPLICATION_PREFERRED_NAME: Tag = Tag::new(0x9F12);
/// Application Identifier (AID) - terminal
pub const TERMINAL_AID: Tag = Tag::new(0x9F06);

// Cardholder and account data
/// Application Primary Account Number (PAN)
pub const PAN: Tag = Tag::new(0x5A);
/// Track 2 Equivalent Data
pub const TRACK_2_EQUIVALENT: Tag = Tag::new(0x57);
/// Track 2 Data (contactless magstripe mode)
pub const TRACK_2_DATA: Tag = Tag::new(0x9F6B);
/// Cardholder Name
pub const CARDHOLDER_NAME: Tag = Tag::new(0x5F20);
/// Application Expiration Date (YYMMDD)
pub const EXPIRATION_DATE: Tag = Tag::new(0x5F24);
/// Expiration date carried outside the application template (YYMM)
pub const EXPIRY_DATE_SHORT: Tag = Tag::new(0x59);
/// Application PAN Sequence Number
pub const PAN_SEQUENCE_NUMBER: Tag = Tag::new(0x5F34);

// Transaction data
/// Amount, Authorised (Numeric)
pub const AMOUNT_AUTHORISED: Tag = Tag::new(0x9F02);
/// Amount, Other (Numeric)
pub const AMOUNT_OTHER: Tag = Tag::new(0x9F03);
/// Transaction Currency Code
pub const TRANSACTION_CURRENCY_CODE: Tag = Tag::new(0x5F2A);
/// Transaction Date
pub const TRANSACTION_DATE: Tag = Tag::new(0x9A);
/// Transaction Type
pub const TRANSACTION_TYPE: Tag = Tag::new(0x9C);

// Cardholder verification
/// Cardholder Verification Method (CVM) List
pub const CVM_LIST: Tag = Tag::new(0x8E);
/// Cardholder Verification Method (CVM) Results
pub const CVM_RESULTS: Tag = Tag::new(0x9F34);

// Risk management and diagnostics
/// Terminal Verification Results
pub const TVR: Tag = Tag::new(0x95);
/// Transaction Status Information
pub const TSI: Tag = Tag::new(0x9B);
/// Certification Authority Public Key Index
pub const CAPK_INDEX: Tag = Tag::new(0x8F);
/// Application Interchange Profile
pub const AIP: Tag = Tag::new(0x82);
/// Application Transaction Counter
pub const ATC: Tag = Tag::new(0x9F36);
/// Application Cryptogram
pub const APPLICATION_CRYPTOGRAM: Tag = Tag::new(0x9F26);
/// Cryptogram Information Data
pub const CRYPTOGRAM_INFORMATION_DATA: Tag = Tag::new(0x9F27);
/// Issuer Application Data
pub const ISSUER_APPLICATION_DATA: Tag = Tag::new(0x9F10);
/// Unpredictable Number
pub const UNPREDICTABLE_NUMBER: Tag = Tag::new(0x9F37);
/// Terminal Country Code
pub const TERMINAL_COUNTRY_CODE: Tag = Tag::new(0x9F1A);

// Online response
/// Authorisation Response Code
pub const AUTHORISATION_RESPONSE_CODE: Tag = Tag::new(0x8A);
/// Issuer Authentication Data
pub const ISSUER_AUTHENTICATION_DATA: Tag = Tag::new(0x91);
/// Issuer Script Template 1
pub const ISSUER_SCRIPT_TEMPLATE_1: Tag = Tag::new(0x71);
/// Issuer Script Template 2
pub const ISSUER_SCRIPT_TEMPLATE_2: Tag = Tag::new(0x72);

/// Tags sent to the acquirer with an online authorization request
pub const ONLINE_REQUEST_TAGS: &[Tag] = &[
    APPLICATION_CRYPTOGRAM,
    CRYPTOGRAM_INFORMATION_DATA,
    ISSUER_APPLICATION_DATA,
    UNPREDICTABLE_NUMBER,
    ATC,
    TVR,
    TRANSACTION_DATE,
    TRANSACTION_TYPE,
    AMOUNT_AUTHORISED,
    TRANSACTION_CURRENCY_CODE,
    AIP,
    TERMINAL_COUNTRY_CODE,
    AMOUNT_OTHER,
    CVM_RESULTS,
    PAN_SEQUENCE_NUMBER,
];

/// Human readable name for a tag
pub const fn name(tag: Tag) -> &'static str {
    match tag.value() {
        0x4F => "Application Identifier (AID)",
        0x50 => "Application Label",
        0x57 => "Track 2 Equivalent Data",
        0x59 => "Expiration Date",
        0x5A => "Application PAN",
        0x5F20 => "Cardholder Name",
        0x5F24 => "Application Expiration Date",
        0x5F2A => "Transaction Currency Code",
        0x5F34 => "Application PAN Sequence Number",
        0x71 => "Issuer Script Template 1",
        0x72 => "Issuer Script Template 2",
        0x82 => "Application Interchange Profile",
        0x8A => "Authorisation Response Code",
        0x8E => "CVM List",
        0x8F => "CA Public Key Index",
        0x91 => "Issuer Authentication Data",
        0x95 => "Terminal Verification Results",
        0x9A => "Transaction Date",
        0x9B => "Transaction Status Information",
        0x9C => "Transaction Type",
        0x9F02 => "Amount, Authorised",
        0x9F03 => "Amount, Other",
        0x9F06 => "Application Identifier (AID) - terminal",
        0x9F10 => "Issuer Application Data",
        0x9F12 => "Application Preferred Name",
        0x9F1A => "Terminal Country Code",
        0x9F26 => "Application Cryptogram",
        0x9F27 => "Cryptogram Information Data",
        0x9F34 => "CVM Results",
        0x9F36 => "Application Transaction Counter",
        0x9F37 => "Unpredictable Number",
        0x9F6B => "Track 2 Data",
        _ => "Unknown Tag",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names() {
        assert_eq!(name(CVM_LIST), "CVM List");
        assert_eq!(name(TRACK_2_DATA), "Track 2 Data");
        assert_eq!(name(Tag::new(0xDF01)), "Unknown Tag");
    }
}
