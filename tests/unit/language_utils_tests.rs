/*!
 * Tests for language code utilities
 */

use subcondense::language_utils::{
    get_language_name, language_codes_match, matches_preferred, normalize_to_part2t, validate_language_code,
    LanguageCodeType,
};

/// Test that stream tags and sidecar tags compare equal across ISO forms
#[test]
fn test_languageCodesMatch_withStreamAndSidecarTags_shouldMatch() {
    assert!(language_codes_match("jpn", "ja"));
    assert!(language_codes_match("chi", "zh"));
    assert!(language_codes_match("FRE", "fra"));
    assert!(!language_codes_match("eng", "jpn"));
}

/// Test that unknown tags never match a preference
#[test]
fn test_matchesPreferred_withUnknownTag_shouldBeFalse() {
    assert!(!matches_preferred(Some("und"), Some("ja")));
    assert!(!matches_preferred(Some(""), Some("ja")));
    assert!(matches_preferred(Some("ja"), Some("jpn")));
}

/// Test normalization and validation
#[test]
fn test_normalizeToPart2t_withAllForms_shouldReturnPart2t() {
    assert_eq!(normalize_to_part2t("en").unwrap(), "eng");
    assert_eq!(normalize_to_part2t("ger").unwrap(), "deu");
    assert!(normalize_to_part2t("e").is_err());
    assert_eq!(validate_language_code("de").unwrap(), LanguageCodeType::Part1);
}

/// Test that names are resolved for known codes
#[test]
fn test_getLanguageName_withKnownCode_shouldReturnName() {
    assert_eq!(get_language_name("fr").unwrap(), "French");
    assert_eq!(get_language_name("jpn").unwrap(), "Japanese");
}
