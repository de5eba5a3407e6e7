//! Static lookup tables for the address normalizer.
//!
//! Country and province names cover the markets the supplier address forms
//! care about; anything absent from a table passes through untouched rather
//! than failing.

/// Resolve an ISO 3166-1 alpha-2 code to a display name.
#[must_use]
pub fn country_name(code: &str) -> Option<&'static str> {
    let name = match code.to_uppercase().as_str() {
        "US" => "United States",
        "GB" | "UK" => "United Kingdom",
        "CA" => "Canada",
        "AU" => "Australia",
        "NZ" => "New Zealand",
        "FR" => "France",
        "DE" => "Germany",
        "ES" => "Spain",
        "IT" => "Italy",
        "PT" => "Portugal",
        "NL" => "Netherlands",
        "BE" => "Belgium",
        "AT" => "Austria",
        "CH" => "Switzerland",
        "IE" => "Ireland",
        "SE" => "Sweden",
        "NO" => "Norway",
        "DK" => "Denmark",
        "FI" => "Finland",
        "PL" => "Poland",
        "CZ" => "Czech Republic",
        "SK" => "Slovakia",
        "HU" => "Hungary",
        "RO" => "Romania",
        "BG" => "Bulgaria",
        "GR" => "Greece",
        "HR" => "Croatia",
        "SI" => "Slovenia",
        "RS" => "Serbia",
        "MK" => "Macedonia",
        "UA" => "Ukraine",
        "RU" => "Russia",
        "TR" => "Turkey",
        "IL" => "Israel",
        "SA" => "Saudi Arabia",
        "AE" => "United Arab Emirates",
        "BR" => "Brazil",
        "AR" => "Argentina",
        "CL" => "Chile",
        "CO" => "Colombia",
        "MX" => "Mexico",
        "PE" => "Peru",
        "JP" => "Japan",
        "KR" => "South Korea",
        "CN" => "China",
        "HK" => "Hong Kong",
        "TW" => "Taiwan",
        "SG" => "Singapore",
        "MY" => "Malaysia",
        "TH" => "Thailand",
        "VN" => "Vietnam",
        "PH" => "Philippines",
        "ID" => "Indonesia",
        "IN" => "India",
        "ZA" => "South Africa",
        "EG" => "Egypt",
        "MA" => "Morocco",
        "NG" => "Nigeria",
        "PR" => "Puerto Rico",
        "VI" => "Virgin Islands (U.S.)",
        "GU" => "Guam",
        _ => return None,
    };
    Some(name)
}

/// Resolve a province/state code to a display name, per country.
#[must_use]
pub fn province_name(country_code: &str, province_code: &str) -> Option<&'static str> {
    match country_code.to_uppercase().as_str() {
        "US" | "PR" | "VI" | "GU" => us_state_name(province_code),
        "CA" => ca_province_name(province_code),
        "AU" => au_state_name(province_code),
        "BR" => br_state_name(province_code),
        _ => None,
    }
}

fn us_state_name(code: &str) -> Option<&'static str> {
    let name = match code.to_uppercase().as_str() {
        "AL" => "Alabama",
        "AK" => "Alaska",
        "AZ" => "Arizona",
        "AR" => "Arkansas",
        "CA" => "California",
        "CO" => "Colorado",
        "CT" => "Connecticut",
        "DE" => "Delaware",
        "DC" => "District of Columbia",
        "FL" => "Florida",
        "GA" => "Georgia",
        "HI" => "Hawaii",
        "ID" => "Idaho",
        "IL" => "Illinois",
        "IN" => "Indiana",
        "IA" => "Iowa",
        "KS" => "Kansas",
        "KY" => "Kentucky",
        "LA" => "Louisiana",
        "ME" => "Maine",
        "MD" => "Maryland",
        "MA" => "Massachusetts",
        "MI" => "Michigan",
        "MN" => "Minnesota",
        "MS" => "Mississippi",
        "MO" => "Missouri",
        "MT" => "Montana",
        "NE" => "Nebraska",
        "NV" => "Nevada",
        "NH" => "New Hampshire",
        "NJ" => "New Jersey",
        "NM" => "New Mexico",
        "NY" => "New York",
        "NC" => "North Carolina",
        "ND" => "North Dakota",
        "OH" => "Ohio",
        "OK" => "Oklahoma",
        "OR" => "Oregon",
        "PA" => "Pennsylvania",
        "RI" => "Rhode Island",
        "SC" => "South Carolina",
        "SD" => "South Dakota",
        "TN" => "Tennessee",
        "TX" => "Texas",
        "UT" => "Utah",
        "VT" => "Vermont",
        "VA" => "Virginia",
        "WA" => "Washington",
        "WV" => "West Virginia",
        "WI" => "Wisconsin",
        "WY" => "Wyoming",
        "PR" => "Puerto Rico",
        "VI" => "Virgin Islands (U.S.)",
        "GU" => "Guam",
        _ => return None,
    };
    Some(name)
}

fn ca_province_name(code: &str) -> Option<&'static str> {
    let name = match code.to_uppercase().as_str() {
        "AB" => "Alberta",
        "BC" => "British Columbia",
        "MB" => "Manitoba",
        "NB" => "New Brunswick",
        "NL" => "Newfoundland and Labrador",
        "NS" => "Nova Scotia",
        "NT" => "Northwest Territories",
        "NU" => "Nunavut",
        "ON" => "Ontario",
        "PE" => "Prince Edward Island",
        "QC" => "Quebec",
        "SK" => "Saskatchewan",
        "YT" => "Yukon",
        _ => return None,
    };
    Some(name)
}

fn au_state_name(code: &str) -> Option<&'static str> {
    let name = match code.to_uppercase().as_str() {
        "ACT" => "Australian Capital Territory",
        "NSW" => "New South Wales",
        "NT" => "Northern Territory",
        "QLD" => "Queensland",
        "SA" => "South Australia",
        "TAS" => "Tasmania",
        "VIC" => "Victoria",
        "WA" => "Western Australia",
        _ => return None,
    };
    Some(name)
}

fn br_state_name(code: &str) -> Option<&'static str> {
    let name = match code.to_uppercase().as_str() {
        "AC" => "Acre",
        "AL" => "Alagoas",
        "AM" => "Amazonas",
        "BA" => "Bahia",
        "CE" => "Ceara",
        "DF" => "Distrito Federal",
        "ES" => "Espirito Santo",
        "GO" => "Goias",
        "MA" => "Maranhao",
        "MG" => "Minas Gerais",
        "MS" => "Mato Grosso do Sul",
        "MT" => "Mato Grosso",
        "PA" => "Para",
        "PB" => "Paraiba",
        "PE" => "Pernambuco",
        "PI" => "Piaui",
        "PR" => "Parana",
        "RJ" => "Rio de Janeiro",
        "RN" => "Rio Grande do Norte",
        "RO" => "Rondonia",
        "RR" => "Roraima",
        "RS" => "Rio Grande do Sul",
        "SC" => "Santa Catarina",
        "SE" => "Sergipe",
        "SP" => "Sao Paulo",
        "TO" => "Tocantins",
        _ => return None,
    };
    Some(name)
}

/// UK city to county/region, for inferring a province when the platform
/// sends none. AliExpress's UK address form wants a county value.
#[must_use]
pub fn uk_city_province(city: &str) -> Option<&'static str> {
    let province = match city.to_lowercase().trim() {
        "london" => "Greater London",
        "birmingham" | "coventry" | "wolverhampton" => "West Midlands",
        "manchester" | "salford" | "bolton" | "stockport" => "Greater Manchester",
        "liverpool" | "st helens" => "Merseyside",
        "leeds" | "bradford" | "wakefield" | "huddersfield" => "West Yorkshire",
        "sheffield" | "rotherham" | "doncaster" | "barnsley" => "South Yorkshire",
        "newcastle" | "newcastle upon tyne" | "sunderland" | "gateshead" => "Tyne and Wear",
        "bristol" => "Bristol",
        "nottingham" => "Nottinghamshire",
        "leicester" => "Leicestershire",
        "derby" => "Derbyshire",
        "southampton" | "portsmouth" | "winchester" => "Hampshire",
        "brighton" | "hove" => "East Sussex",
        "oxford" => "Oxfordshire",
        "cambridge" => "Cambridgeshire",
        "norwich" => "Norfolk",
        "ipswich" => "Suffolk",
        "reading" => "Berkshire",
        "milton keynes" => "Buckinghamshire",
        "luton" => "Bedfordshire",
        "plymouth" | "exeter" => "Devon",
        "york" | "hull" | "kingston upon hull" => "East Riding of Yorkshire",
        "stoke-on-trent" | "stoke on trent" => "Staffordshire",
        "glasgow" => "Glasgow City",
        "edinburgh" => "City of Edinburgh",
        "aberdeen" => "Aberdeenshire",
        "dundee" => "Dundee City",
        "cardiff" => "Cardiff",
        "swansea" => "Swansea",
        "newport" => "Newport",
        "belfast" => "Belfast",
        "londonderry" | "derry" => "Derry and Strabane",
        "douglas" => "Isle of Man",
        _ => return None,
    };
    Some(province)
}

/// Region fallback used when the UK city table has no entry.
pub const UK_REGION_FALLBACK: &str = "England";

/// Countries whose AliExpress address form offers an "Other" province value.
pub const SUPPORTS_OTHER_PROVINCE: &[&str] = &[
    "FR", "ES", "IT", "NL", "PL", "PT", "SA", "AE", "TR", "GR", "RO",
];

/// Valid (province, cities) combinations per country, mirroring the
/// AliExpress address form. Only countries present here are validated;
/// absence means "accept whatever the platform sent".
#[must_use]
pub fn aliexpress_provinces(
    country_code: &str,
) -> Option<&'static [(&'static str, &'static [&'static str])]> {
    let table: &'static [(&'static str, &'static [&'static str])] =
        match country_code.to_uppercase().as_str() {
            "FR" => &[
                ("Ile-de-France", &["paris", "versailles", "boulogne-billancourt", "argenteuil"]),
                ("Provence-Alpes-Cote d'Azur", &["marseille", "nice", "toulon", "aix-en-provence"]),
                ("Auvergne-Rhone-Alpes", &["lyon", "grenoble", "saint-etienne", "villeurbanne"]),
                ("Occitanie", &["toulouse", "montpellier", "nimes", "perpignan"]),
                ("Nouvelle-Aquitaine", &["bordeaux", "limoges", "poitiers", "pau"]),
                ("Hauts-de-France", &["lille", "amiens", "roubaix", "tourcoing"]),
                ("Grand Est", &["strasbourg", "reims", "metz", "nancy"]),
                ("Pays de la Loire", &["nantes", "angers", "le mans"]),
                ("Bretagne", &["rennes", "brest", "quimper"]),
                ("Normandie", &["rouen", "caen", "le havre"]),
            ],
            "ES" => &[
                ("Madrid", &["madrid", "mostoles", "alcala de henares", "getafe"]),
                ("Catalonia", &["barcelona", "hospitalet de llobregat", "badalona", "terrassa"]),
                ("Andalusia", &["seville", "sevilla", "malaga", "cordoba", "granada"]),
                ("Valencia", &["valencia", "alicante", "elche", "castellon"]),
                ("Basque Country", &["bilbao", "vitoria-gasteiz", "san sebastian"]),
                ("Galicia", &["vigo", "a coruna", "ourense"]),
                ("Castile and Leon", &["valladolid", "burgos", "salamanca", "leon"]),
                ("Aragon", &["zaragoza", "huesca", "teruel"]),
            ],
            "IT" => &[
                ("Lazio", &["rome", "roma", "latina", "viterbo"]),
                ("Lombardy", &["milan", "milano", "brescia", "monza", "bergamo"]),
                ("Campania", &["naples", "napoli", "salerno", "caserta"]),
                ("Piedmont", &["turin", "torino", "novara", "alessandria"]),
                ("Sicily", &["palermo", "catania", "messina", "syracuse"]),
                ("Veneto", &["venice", "venezia", "verona", "padua", "padova"]),
                ("Emilia-Romagna", &["bologna", "parma", "modena", "ravenna"]),
                ("Tuscany", &["florence", "firenze", "pisa", "livorno"]),
            ],
            "NL" => &[
                ("Noord-Holland", &["amsterdam", "haarlem", "zaandam", "alkmaar"]),
                ("Zuid-Holland", &["rotterdam", "the hague", "den haag", "leiden", "delft"]),
                ("Utrecht", &["utrecht", "amersfoort", "veenendaal"]),
                ("Noord-Brabant", &["eindhoven", "tilburg", "breda", "den bosch"]),
                ("Gelderland", &["nijmegen", "arnhem", "apeldoorn"]),
                ("Limburg", &["maastricht", "venlo", "heerlen"]),
                ("Overijssel", &["enschede", "zwolle", "deventer"]),
                ("Groningen", &["groningen"]),
            ],
            "PL" => &[
                ("Mazowieckie", &["warsaw", "warszawa", "radom", "plock"]),
                ("Malopolskie", &["krakow", "cracow", "tarnow", "nowy sacz"]),
                ("Dolnoslaskie", &["wroclaw", "walbrzych", "legnica"]),
                ("Wielkopolskie", &["poznan", "kalisz", "konin"]),
                ("Pomorskie", &["gdansk", "gdynia", "sopot", "slupsk"]),
                ("Slaskie", &["katowice", "czestochowa", "gliwice", "zabrze"]),
                ("Lodzkie", &["lodz", "piotrkow trybunalski"]),
                ("Zachodniopomorskie", &["szczecin", "koszalin"]),
            ],
            "SA" => &[
                ("Riyadh", &["riyadh", "al kharj", "ad diriyah"]),
                ("Makkah", &["jeddah", "mecca", "makkah", "taif"]),
                ("Eastern Province", &["dammam", "al khobar", "dhahran", "jubail"]),
                ("Madinah", &["medina", "madinah", "yanbu"]),
                ("Asir", &["abha", "khamis mushait"]),
            ],
            _ => return None,
        };
    Some(table)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_country_name_lookup() {
        assert_eq!(country_name("fr"), Some("France"));
        assert_eq!(country_name("UK"), Some("United Kingdom"));
        assert_eq!(country_name("ZZ"), None);
    }

    #[test]
    fn test_uk_city_table() {
        assert_eq!(uk_city_province("Douglas"), Some("Isle of Man"));
        assert_eq!(uk_city_province("MANCHESTER"), Some("Greater Manchester"));
        assert_eq!(uk_city_province("nowhereville"), None);
    }

    #[test]
    fn test_aliexpress_table_presence() {
        assert!(aliexpress_provinces("FR").is_some());
        assert!(aliexpress_provinces("US").is_none());
    }
}
