//! Bus operator type and its wire mappings.

use std::fmt;

/// A bus operator whose services appear in the open-data feed.
///
/// The feed spells operators two ways: a short code on the service, stop and
/// vehicle endpoints (e.g. "RBUS"), and a display name on the timetable
/// endpoints (e.g. "Reading Buses"). Both mappings live in tables here so
/// they can be used without going through serde.
///
/// # Examples
///
/// ```
/// use reading_buses::domain::Company;
///
/// assert_eq!(Company::from_code("RBUS"), Company::ReadingBuses);
/// assert_eq!(Company::ReadingBuses.code(), "RBUS");
///
/// // Anything unknown is `Other`
/// assert_eq!(Company::from_code("XYZ"), Company::Other);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Company {
    ReadingBuses,
    NewburyAndDistrict,
    ThamesValley,
    OxfordBusCompany,
    CarouselBuses,
    Other,
}

/// (company, short code, display name). The first row for a company wins when encoding.
const TABLE: &[(Company, &str, &str)] = &[
    (Company::ReadingBuses, "RBUS", "Reading Buses"),
    (Company::NewburyAndDistrict, "NADS", "Newbury & District"),
    (Company::ThamesValley, "CTNY", "Thames Valley Buses"),
    (Company::OxfordBusCompany, "OXBC", "Oxford Bus Company"),
    (Company::CarouselBuses, "CSLB", "Carousel Buses"),
    (Company::Other, "OTH", "Other"),
];

/// Codes older feeds used. Decode only.
const LEGACY_CODES: &[(&str, Company)] = &[
    ("RGB", Company::ReadingBuses),
    ("N&D", Company::NewburyAndDistrict),
];

impl Company {
    /// All operators, in declaration order.
    pub const ALL: [Company; 6] = [
        Company::ReadingBuses,
        Company::NewburyAndDistrict,
        Company::ThamesValley,
        Company::OxfordBusCompany,
        Company::CarouselBuses,
        Company::Other,
    ];

    /// Decode an operator short code. Unknown codes map to `Other`.
    pub fn from_code(code: &str) -> Company {
        let code = code.trim();
        TABLE
            .iter()
            .find(|(_, c, _)| c.eq_ignore_ascii_case(code))
            .map(|(company, _, _)| *company)
            .or_else(|| {
                LEGACY_CODES
                    .iter()
                    .find(|(c, _)| c.eq_ignore_ascii_case(code))
                    .map(|(_, company)| *company)
            })
            .unwrap_or(Company::Other)
    }

    /// Decode an operator display name. Unknown names map to `Other`.
    pub fn from_display_name(name: &str) -> Company {
        let name = name.trim();
        TABLE
            .iter()
            .find(|(_, _, n)| n.eq_ignore_ascii_case(name))
            .map(|(company, _, _)| *company)
            .unwrap_or(Company::Other)
    }

    /// The operator short code.
    pub fn code(self) -> &'static str {
        self.row().1
    }

    /// The operator display name.
    pub fn display_name(self) -> &'static str {
        self.row().2
    }

    fn row(self) -> &'static (Company, &'static str, &'static str) {
        // every variant has a row
        TABLE
            .iter()
            .find(|(company, _, _)| *company == self)
            .unwrap_or(&TABLE[TABLE.len() - 1])
    }
}

impl fmt::Display for Company {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Serde adapter for fields carrying the operator short code.
pub mod code {
    use serde::{Deserialize, Deserializer, Serializer};

    use super::Company;

    pub fn serialize<S: Serializer>(company: &Company, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(company.code())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Company, D::Error> {
        let raw = Option::<String>::deserialize(d)?;
        Ok(raw.as_deref().map_or(Company::Other, Company::from_code))
    }
}

/// Serde adapter for fields carrying the operator display name.
pub mod display_name {
    use serde::{Deserialize, Deserializer, Serializer};

    use super::Company;

    pub fn serialize<S: Serializer>(company: &Company, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(company.display_name())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Company, D::Error> {
        let raw = Option::<String>::deserialize(d)?;
        Ok(raw.as_deref().map_or(Company::Other, Company::from_display_name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_known_codes() {
        assert_eq!(Company::from_code("RBUS"), Company::ReadingBuses);
        assert_eq!(Company::from_code("NADS"), Company::NewburyAndDistrict);
        assert_eq!(Company::from_code("CTNY"), Company::ThamesValley);
        assert_eq!(Company::from_code("OXBC"), Company::OxfordBusCompany);
        assert_eq!(Company::from_code("CSLB"), Company::CarouselBuses);
        assert_eq!(Company::from_code("OTH"), Company::Other);
    }

    #[test]
    fn decode_is_case_insensitive_and_trims() {
        assert_eq!(Company::from_code("rbus"), Company::ReadingBuses);
        assert_eq!(Company::from_code(" NADS "), Company::NewburyAndDistrict);
    }

    #[test]
    fn legacy_codes_decode_but_never_encode() {
        assert_eq!(Company::from_code("RGB"), Company::ReadingBuses);
        assert_eq!(Company::from_code("N&D"), Company::NewburyAndDistrict);
        assert_eq!(Company::ReadingBuses.code(), "RBUS");
    }

    #[test]
    fn unknown_is_other() {
        assert_eq!(Company::from_code(""), Company::Other);
        assert_eq!(Company::from_code("KC"), Company::Other);
        assert_eq!(Company::from_display_name("Arriva"), Company::Other);
    }

    #[test]
    fn display_names() {
        assert_eq!(
            Company::from_display_name("Newbury & District"),
            Company::NewburyAndDistrict
        );
        assert_eq!(
            Company::from_display_name("Thames Valley Buses"),
            Company::ThamesValley
        );
        assert_eq!(format!("{}", Company::ReadingBuses), "Reading Buses");
    }

    #[test]
    fn serde_adapters() {
        #[derive(serde::Serialize, serde::Deserialize)]
        struct Row {
            #[serde(with = "code")]
            short: Company,
            #[serde(with = "display_name")]
            long: Company,
        }

        let row: Row =
            serde_json::from_str(r#"{"short":"CTNY","long":"Reading Buses"}"#).unwrap();
        assert_eq!(row.short, Company::ThamesValley);
        assert_eq!(row.long, Company::ReadingBuses);

        let json = serde_json::to_string(&row).unwrap();
        assert_eq!(json, r#"{"short":"CTNY","long":"Reading Buses"}"#);

        let row: Row = serde_json::from_str(r#"{"short":null,"long":null}"#).unwrap();
        assert_eq!(row.short, Company::Other);
    }
}
