//! Address Normalizer.
//!
//! Converts a platform-reported customer address into the canonical
//! [`NormalizedAddress`] handed to supplier order forms, applying
//! deterministic per-country corrections (postal code shapes, province
//! aliasing, UK county inference, US-territory reclassification) and the
//! optional AliExpress (province, city) validation.
//!
//! This component never raises: missing fields degrade to empty strings and
//! every correction is reported back as an [`AddressCorrection`] the caller
//! can log or display next to the order.

mod data;

use dropkit_core::{AddressCorrection, AddressFlags, NormalizedAddress, RawAddress};
use tracing::debug;

pub use data::{country_name, province_name, uk_city_province};

/// Normalize a raw platform address.
///
/// Returns the corrected address plus the list of corrections applied, in
/// application order.
#[must_use]
pub fn normalize_address(
    raw: &RawAddress,
    phone: Option<&str>,
    flags: &AddressFlags,
) -> (NormalizedAddress, Vec<AddressCorrection>) {
    let mut corrections = Vec::new();

    let first = field(&raw.first_name);
    let last = field(&raw.last_name);
    let mut name = match field(&raw.name) {
        n if !n.is_empty() => n,
        _ => format!("{first} {last}").trim().to_string(),
    };
    name = transliterate(&name, flags.german_umlauts);

    let mut company = transliterate(&field(&raw.company), flags.german_umlauts);
    let mut city = transliterate(&field(&raw.city), flags.german_umlauts);

    let line1 = transliterate(&field(&raw.address1), flags.german_umlauts);
    let line2 = transliterate(&field(&raw.address2), flags.german_umlauts);
    // Supplier forms take one street line; the second is merged in and the
    // freed field stays available for the AliExpress city fold below.
    let mut address1 = if line2.is_empty() {
        line1
    } else if line1.is_empty() {
        line2
    } else {
        format!("{line1}, {line2}")
    };
    let mut address2 = String::new();

    let mut country_code = field(&raw.country_code).to_uppercase();
    let mut country = match field(&raw.country) {
        c if !c.is_empty() => c,
        _ => data::country_name(&country_code).unwrap_or_default().to_string(),
    };

    let province_code = field(&raw.province_code);
    let mut province = match field(&raw.province) {
        p if !p.is_empty() => p,
        _ => data::province_name(&country_code, &province_code)
            .unwrap_or(province_code.as_str())
            .to_string(),
    };

    let mut zip = field(&raw.zip);

    match country_code.as_str() {
        "FR" => {
            let digits: String = zip.chars().filter(char::is_ascii_digit).collect();
            if !digits.is_empty() {
                let padded = format!("{digits:0>5}");
                push_correction(&mut corrections, "zip", &zip, &padded, "France postal codes are 5 digits");
                zip = padded;
            }
        }
        "BR" => {
            let (street, cep) = fix_br_address(&address1, &zip);
            push_correction(&mut corrections, "address1", &address1, &street, "Brazil street normalization");
            push_correction(&mut corrections, "zip", &zip, &cep, "Brazil CEP format");
            address1 = street;
            zip = cep;
        }
        "IL" => {
            let digits: String = zip.chars().filter(char::is_ascii_digit).collect();
            if !digits.is_empty() {
                let padded = format!("{digits:0>7}");
                push_correction(&mut corrections, "zip", &zip, &padded, "Israel postal codes are 7 digits");
                zip = padded;
            }
        }
        "CA" => {
            let fixed: String = zip.chars().filter(|c| !c.is_whitespace()).collect::<String>().to_uppercase();
            push_correction(&mut corrections, "zip", &zip, &fixed, "Canada postal code casing");
            zip = fixed;
            if province.eq_ignore_ascii_case("newfoundland") {
                push_correction(
                    &mut corrections,
                    "province",
                    &province,
                    "Newfoundland and Labrador",
                    "Current province name",
                );
                province = "Newfoundland and Labrador".to_string();
            }
        }
        "GB" | "UK" => {
            let respaced = respace_uk_postcode(&zip);
            push_correction(&mut corrections, "zip", &zip, &respaced, "UK postcode spacing");
            zip = respaced;
            if province.is_empty() {
                let inferred = data::uk_city_province(&city).unwrap_or(data::UK_REGION_FALLBACK);
                push_correction(&mut corrections, "province", "", inferred, "County inferred from city");
                province = inferred.to_string();
            }
        }
        "PL" => {
            let stripped: String = zip
                .chars()
                .filter(|c| !c.is_whitespace() && !c.is_ascii_punctuation())
                .collect();
            push_correction(&mut corrections, "zip", &zip, &stripped, "Poland postal code format");
            zip = stripped;
        }
        "MK" => {
            if country != "Macedonia" {
                push_correction(&mut corrections, "country", &country, "Macedonia", "Supplier form country name");
                country = "Macedonia".to_string();
            }
        }
        "US" => {
            // The supplier address form lists US territories as countries of
            // their own.
            let territory = match province.to_lowercase().as_str() {
                "puerto rico" => Some(("PR", "Puerto Rico")),
                "virgin islands" | "virgin islands (u.s.)" | "u.s. virgin islands" => {
                    Some(("VI", "Virgin Islands (U.S.)"))
                }
                "guam" => Some(("GU", "Guam")),
                _ => None,
            };
            if let Some((code, territory_name)) = territory {
                push_correction(&mut corrections, "country", &country, territory_name, "US territory reclassified");
                country_code = code.to_string();
                country = territory_name.to_string();
            }
        }
        _ => {}
    }

    if flags.aliexpress_fix {
        apply_aliexpress_fix(
            &country_code,
            &mut province,
            &mut city,
            &mut address2,
            flags.aliexpress_fix_city,
            &mut corrections,
        );
    }

    if flags.shipstation_fix && !company.is_empty() {
        // ShipStation has no company field on the supplier side; keep the
        // company visible by folding it into the name.
        let merged = format!("{name} / {company}");
        push_correction(&mut corrections, "name", &name, &merged, "Company folded into name");
        name = merged;
        company = String::new();
    }

    if !corrections.is_empty() {
        debug!(count = corrections.len(), country = %country_code, "Applied address corrections");
    }

    let normalized = NormalizedAddress {
        name,
        company,
        address1,
        address2,
        city,
        province,
        province_code,
        zip,
        country,
        country_code,
        phone: clean_phone(phone.unwrap_or_default()),
    };
    (normalized, corrections)
}

fn field(value: &Option<String>) -> String {
    value.as_deref().unwrap_or_default().trim().to_string()
}

fn push_correction(
    corrections: &mut Vec<AddressCorrection>,
    field: &str,
    before: &str,
    after: &str,
    reason: &str,
) {
    if before != after {
        corrections.push(AddressCorrection {
            field: field.to_string(),
            before: before.to_string(),
            after: after.to_string(),
            reason: reason.to_string(),
        });
    }
}

/// Strip diacritics; in German mode umlauts expand to ASCII pairs.
///
/// Characters outside the folding table (CJK, Cyrillic) pass through - the
/// supplier form accepts them and dropping them would corrupt the address.
#[must_use]
pub fn transliterate(input: &str, german_umlauts: bool) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        if german_umlauts {
            match c {
                'ä' => {
                    out.push_str("ae");
                    continue;
                }
                'ö' => {
                    out.push_str("oe");
                    continue;
                }
                'ü' => {
                    out.push_str("ue");
                    continue;
                }
                'Ä' => {
                    out.push_str("Ae");
                    continue;
                }
                'Ö' => {
                    out.push_str("Oe");
                    continue;
                }
                'Ü' => {
                    out.push_str("Ue");
                    continue;
                }
                'ß' => {
                    out.push_str("ss");
                    continue;
                }
                _ => {}
            }
        }
        match c {
            // Thorn folds to a digraph, not a single letter.
            'þ' => out.push_str("th"),
            'Þ' => out.push_str("Th"),
            _ => out.push(fold_char(c)),
        }
    }
    out
}

#[allow(clippy::match_same_arms)]
const fn fold_char(c: char) -> char {
    match c {
        'á' | 'à' | 'â' | 'ä' | 'ã' | 'å' | 'ā' | 'ă' | 'ą' => 'a',
        'Á' | 'À' | 'Â' | 'Ä' | 'Ã' | 'Å' | 'Ā' | 'Ă' | 'Ą' => 'A',
        'é' | 'è' | 'ê' | 'ë' | 'ē' | 'ė' | 'ę' | 'ě' => 'e',
        'É' | 'È' | 'Ê' | 'Ë' | 'Ē' | 'Ė' | 'Ę' | 'Ě' => 'E',
        'í' | 'ì' | 'î' | 'ï' | 'ī' | 'į' => 'i',
        'Í' | 'Ì' | 'Î' | 'Ï' | 'Ī' | 'Į' => 'I',
        'ó' | 'ò' | 'ô' | 'ö' | 'õ' | 'ø' | 'ō' | 'ő' => 'o',
        'Ó' | 'Ò' | 'Ô' | 'Ö' | 'Õ' | 'Ø' | 'Ō' | 'Ő' => 'O',
        'ú' | 'ù' | 'û' | 'ü' | 'ū' | 'ů' | 'ű' => 'u',
        'Ú' | 'Ù' | 'Û' | 'Ü' | 'Ū' | 'Ů' | 'Ű' => 'U',
        'ç' | 'ć' | 'č' => 'c',
        'Ç' | 'Ć' | 'Č' => 'C',
        'ñ' | 'ń' | 'ň' => 'n',
        'Ñ' | 'Ń' | 'Ň' => 'N',
        'ś' | 'š' => 's',
        'Ś' | 'Š' => 'S',
        'ź' | 'ż' | 'ž' => 'z',
        'Ź' | 'Ż' | 'Ž' => 'Z',
        'ý' | 'ÿ' => 'y',
        'Ý' => 'Y',
        'ł' => 'l',
        'Ł' => 'L',
        'ð' => 'd',
        'Ð' => 'D',
        'ß' => 's',
        'æ' => 'a',
        'Æ' => 'A',
        'œ' => 'o',
        'Œ' => 'O',
        other => other,
    }
}

/// Respace a UK postcode into `XXX XXX` form when it is not already shaped
/// that way. The inward code is always the last three characters.
#[must_use]
pub fn respace_uk_postcode(zip: &str) -> String {
    let compact: String = zip
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_uppercase();
    // Anything outside ASCII alphanumerics is not a plausible postcode;
    // hand it back untouched. This also keeps the slice below on char
    // boundaries.
    if !compact.chars().all(|c| c.is_ascii_alphanumeric())
        || compact.len() < 5
        || compact.len() > 7
    {
        return zip.trim().to_string();
    }
    let split = compact.len() - 3;
    format!("{} {}", &compact[..split], &compact[split..])
}

/// Brazil street normalization: collapse whitespace, separate the house
/// number with a comma, and shape the CEP as `#####-###`.
fn fix_br_address(street: &str, zip: &str) -> (String, String) {
    let collapsed = street.split_whitespace().collect::<Vec<_>>().join(" ");
    // "Rua Alameda Santos 325" -> "Rua Alameda Santos, 325"
    let fixed_street = match collapsed.rsplit_once(' ') {
        Some((head, tail))
            if tail.chars().all(|c| c.is_ascii_digit())
                && !tail.is_empty()
                && !head.ends_with(',') =>
        {
            format!("{head}, {tail}")
        }
        _ => collapsed,
    };

    let digits: String = zip.chars().filter(char::is_ascii_digit).collect();
    let fixed_zip = if digits.len() == 8 {
        format!("{}-{}", &digits[..5], &digits[5..])
    } else {
        zip.trim().to_string()
    };
    (fixed_street, fixed_zip)
}

/// Keep a leading `+` and digits; everything else platforms put in phone
/// fields (spaces, dashes, parens) is dropped.
fn clean_phone(phone: &str) -> String {
    let mut out = String::new();
    for (i, c) in phone.trim().chars().enumerate() {
        if c.is_ascii_digit() || (c == '+' && i == 0) {
            out.push(c);
        }
    }
    out
}

/// AliExpress (province, city) validation against the static address-form
/// tables. Countries absent from the table pass through untouched.
fn apply_aliexpress_fix(
    country_code: &str,
    province: &mut String,
    city: &mut String,
    address2: &mut String,
    fix_city: bool,
    corrections: &mut Vec<AddressCorrection>,
) {
    let Some(table) = data::aliexpress_provinces(country_code) else {
        return;
    };
    let supports_other = data::SUPPORTS_OTHER_PROVINCE
        .contains(&country_code.to_uppercase().as_str());

    let province_entry = table
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(province));
    let canonical_province = province_entry.map(|(name, _)| *name);

    let city_valid = province_entry.is_some_and(|(_, cities)| {
        cities
            .iter()
            .any(|c| c.eq_ignore_ascii_case(city.trim()))
    });

    if city_valid {
        // Use the form's canonical province spelling.
        if let Some(canonical) = canonical_province
            && canonical != province.as_str()
        {
            push_correction(corrections, "province", province, canonical, "AliExpress province spelling");
            *province = canonical.to_string();
        }
        return;
    }

    if fix_city {
        // Keep the original city visible on the package by folding it into
        // the second street line, then satisfy the form with "Other".
        let folded = if address2.is_empty() {
            city.clone()
        } else {
            format!("{address2}, {city}")
        };
        push_correction(corrections, "address2", address2, &folded, "Original city preserved");
        push_correction(corrections, "city", city, "Other", "City not on AliExpress form");
        *address2 = folded;
        *city = "Other".to_string();
    } else if supports_other {
        let folded = if province_entry.is_some() {
            city.clone()
        } else {
            format!("{province} {city}").trim().to_string()
        };
        push_correction(corrections, "province", province, "Other", "Province not on AliExpress form");
        push_correction(corrections, "city", city, &folded, "Original location preserved");
        *province = "Other".to_string();
        *city = folded;
    }
}
