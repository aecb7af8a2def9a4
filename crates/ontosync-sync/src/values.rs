//! Literal lexical forms → store statement values.

use crate::client::StatementValue;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use ontosync_rdf::{LiteralTerm, StoreDatatype};

/// Day precision in the Wikibase time model.
pub const PRECISION_DAY: u8 = 11;
/// Second precision in the Wikibase time model.
pub const PRECISION_SECOND: u8 = 14;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("`{lexical}` is not a valid {expected} value")]
pub struct ValueError {
    pub lexical: String,
    pub expected: StoreDatatype,
}

/// Build the statement value for a literal whose store datatype is `datatype`.
pub fn literal_value(
    literal: &LiteralTerm,
    datatype: StoreDatatype,
) -> Result<StatementValue, ValueError> {
    let lexical = literal.content();
    let invalid = || ValueError {
        lexical: lexical.to_string(),
        expected: datatype,
    };
    let value = match datatype {
        StoreDatatype::String => StatementValue::String {
            value: lexical.to_string(),
        },
        StoreDatatype::Url => StatementValue::Url {
            value: lexical.to_string(),
        },
        StoreDatatype::MonolingualText => StatementValue::MonolingualText {
            text: lexical.to_string(),
            language: literal.language().ok_or_else(invalid)?.to_string(),
        },
        StoreDatatype::Quantity {
            lower_bound,
            upper_bound,
        } => StatementValue::Quantity {
            amount: signed_amount(lexical).ok_or_else(invalid)?,
            lower_bound,
            upper_bound,
        },
        StoreDatatype::Time => {
            let local = literal
                .datatype()
                .and_then(|dt| dt.rsplit_once('#'))
                .map(|(_, local)| local);
            let (time, precision) = time_value(lexical, local).ok_or_else(invalid)?;
            StatementValue::Time { time, precision }
        }
        StoreDatatype::GlobeCoordinate => {
            let (latitude, longitude, precision) = wkt_point(lexical).ok_or_else(invalid)?;
            StatementValue::GlobeCoordinate {
                latitude,
                longitude,
                precision,
            }
        }
        StoreDatatype::ItemReference | StoreDatatype::PropertyReference => return Err(invalid()),
    };
    Ok(value)
}

/// Value pointing at an already resolved entity.
pub fn reference_value(datatype: StoreDatatype, entity_id: String) -> StatementValue {
    match datatype {
        StoreDatatype::PropertyReference => StatementValue::Property { id: entity_id },
        _ => StatementValue::Item { id: entity_id },
    }
}

/// Normalize an `xsd:decimal` lexical form to the store's amount syntax:
/// explicit sign, no leading zeros, no trailing dot. Exponents, `INF` and
/// `NaN` are rejected.
fn signed_amount(lexical: &str) -> Option<String> {
    let trimmed = lexical.trim();
    let (sign, unsigned) = match trimmed.as_bytes().first()? {
        b'+' => ('+', &trimmed[1..]),
        b'-' => ('-', &trimmed[1..]),
        _ => ('+', trimmed),
    };
    let (integer, fraction) = unsigned.split_once('.').unwrap_or((unsigned, ""));
    let all_digits = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
    if integer.is_empty() && fraction.is_empty() {
        return None;
    }
    if !all_digits(integer) || !all_digits(fraction) {
        return None;
    }

    let integer = match integer.trim_start_matches('0') {
        "" => "0",
        digits => digits,
    };
    if fraction.is_empty() {
        Some(format!("{sign}{integer}"))
    } else {
        Some(format!("{sign}{integer}.{fraction}"))
    }
}

fn time_value(lexical: &str, xsd_local: Option<&str>) -> Option<(String, u8)> {
    let lexical = lexical.trim();
    match xsd_local? {
        "date" => {
            let date = NaiveDate::parse_from_str(lexical, "%Y-%m-%d").ok()?;
            Some((
                date.format("+%Y-%m-%dT00:00:00Z").to_string(),
                PRECISION_DAY,
            ))
        }
        "dateTime" => {
            let utc = match DateTime::parse_from_rfc3339(lexical) {
                Ok(with_offset) => with_offset.with_timezone(&Utc).naive_utc(),
                Err(_) => NaiveDateTime::parse_from_str(lexical, "%Y-%m-%dT%H:%M:%S%.f").ok()?,
            };
            Some((
                utc.format("+%Y-%m-%dT%H:%M:%SZ").to_string(),
                PRECISION_SECOND,
            ))
        }
        "time" => {
            let time =
                NaiveTime::parse_from_str(lexical.trim_end_matches('Z'), "%H:%M:%S%.f").ok()?;
            Some((
                time.format("+1970-01-01T%H:%M:%SZ").to_string(),
                PRECISION_SECOND,
            ))
        }
        _ => None,
    }
}

/// Parse `Point(lat lon)`. Precision is `10^-n` for the larger number of
/// decimal digits of the two coordinates.
fn wkt_point(lexical: &str) -> Option<(f64, f64, f64)> {
    let trimmed = lexical.trim();
    let (keyword, rest) = trimmed.split_at(trimmed.find('(')?);
    if !keyword.trim().eq_ignore_ascii_case("point") {
        return None;
    }
    let inner = rest.strip_prefix('(')?.strip_suffix(')')?;
    let mut parts = inner.split_whitespace();
    let (lat, lon) = (parts.next()?, parts.next()?);
    if parts.next().is_some() {
        return None;
    }
    let decimals = |s: &str| s.split_once('.').map_or(0, |(_, frac)| frac.len());
    let digits = decimals(lat).max(decimals(lon));
    let precision = 1.0 / 10f64.powi(digits as i32);
    Some((lat.parse().ok()?, lon.parse().ok()?, precision))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ontosync_rdf::vocab::{xsd, GEO_WKT_LITERAL};

    fn value_of(literal: LiteralTerm) -> Result<StatementValue, ValueError> {
        let datatype = literal.store_datatype().unwrap();
        literal_value(&literal, datatype)
    }

    #[test]
    fn quantities_are_signed_and_keep_bounds() {
        assert_eq!(
            value_of(LiteralTerm::typed("12", xsd("positiveInteger"))).unwrap(),
            StatementValue::Quantity {
                amount: "+12".to_string(),
                lower_bound: Some(1),
                upper_bound: None
            }
        );
        assert_eq!(
            value_of(LiteralTerm::typed("-3.5", xsd("decimal"))).unwrap(),
            StatementValue::Quantity {
                amount: "-3.5".to_string(),
                lower_bound: None,
                upper_bound: None
            }
        );
        assert!(value_of(LiteralTerm::typed("twelve", xsd("integer"))).is_err());
        assert!(value_of(LiteralTerm::typed("NaN", xsd("double"))).is_err());
    }

    #[test]
    fn amounts_follow_decimal_syntax() {
        assert_eq!(signed_amount("12").as_deref(), Some("+12"));
        assert_eq!(signed_amount(" -3.50 ").as_deref(), Some("-3.50"));
        assert_eq!(signed_amount("007").as_deref(), Some("+7"));
        assert_eq!(signed_amount(".5").as_deref(), Some("+0.5"));
        assert_eq!(signed_amount("4.").as_deref(), Some("+4"));
        for rejected in ["1e3", "2.5E-1", "INF", "NaN", "", "+", ".", "1.2.3", "0x10"] {
            assert_eq!(signed_amount(rejected), None, "{rejected}");
        }

        let err = value_of(LiteralTerm::typed("1e3", xsd("double"))).unwrap_err();
        assert_eq!(err.lexical, "1e3");
    }

    #[test]
    fn times_use_wikibase_format() {
        assert_eq!(
            value_of(LiteralTerm::typed("2019-05-20", xsd("date"))).unwrap(),
            StatementValue::Time {
                time: "+2019-05-20T00:00:00Z".to_string(),
                precision: PRECISION_DAY
            }
        );
        assert_eq!(
            value_of(LiteralTerm::typed("2019-05-20T10:30:00+02:00", xsd("dateTime"))).unwrap(),
            StatementValue::Time {
                time: "+2019-05-20T08:30:00Z".to_string(),
                precision: PRECISION_SECOND
            }
        );
        assert_eq!(
            value_of(LiteralTerm::typed("2019-05-20T10:30:00", xsd("dateTime"))).unwrap(),
            StatementValue::Time {
                time: "+2019-05-20T10:30:00Z".to_string(),
                precision: PRECISION_SECOND
            }
        );
        assert_eq!(
            value_of(LiteralTerm::typed("23:15:00", xsd("time"))).unwrap(),
            StatementValue::Time {
                time: "+1970-01-01T23:15:00Z".to_string(),
                precision: PRECISION_SECOND
            }
        );
        assert!(value_of(LiteralTerm::typed("20th of May", xsd("date"))).is_err());
    }

    #[test]
    fn wkt_points() {
        assert_eq!(
            value_of(LiteralTerm::typed("Point(12.34 2.43)", GEO_WKT_LITERAL)).unwrap(),
            StatementValue::GlobeCoordinate {
                latitude: 12.34,
                longitude: 2.43,
                precision: 0.01
            }
        );
        let StatementValue::GlobeCoordinate { precision, .. } =
            value_of(LiteralTerm::typed("POINT (1 2.5)", GEO_WKT_LITERAL)).unwrap()
        else {
            panic!("expected a globe coordinate");
        };
        assert_eq!(precision, 0.1);
        assert!(value_of(LiteralTerm::typed("Polygon((1 2))", GEO_WKT_LITERAL)).is_err());
        assert!(value_of(LiteralTerm::typed("Point(1 2 3)", GEO_WKT_LITERAL)).is_err());
    }

    #[test]
    fn text_values() {
        assert_eq!(
            value_of(LiteralTerm::with_language("Persona", "es")).unwrap(),
            StatementValue::MonolingualText {
                text: "Persona".to_string(),
                language: "es".to_string()
            }
        );
        assert_eq!(
            value_of(LiteralTerm::plain("Human")).unwrap(),
            StatementValue::String {
                value: "Human".to_string()
            }
        );
        assert_eq!(
            reference_value(StoreDatatype::PropertyReference, "P2".to_string()),
            StatementValue::Property {
                id: "P2".to_string()
            }
        );
    }
}
