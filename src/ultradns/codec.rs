//! Conversion between the backend's numbered, positional rdata fields and
//! canonical rdata maps.

use serde_json::Value;
use snafu::OptionExt;

use crate::common::{InvalidInputSnafu, NotFoundSnafu, Rdata, ResponseSnafu, Result};

/// Integer fields carry their largest wire value.
#[derive(Clone, Copy)]
enum Field {
    Text(&'static str),
    Int(&'static str, u64),
}

const U8: u64 = u8::MAX as u64;
const U16: u64 = u16::MAX as u64;
const U32: u64 = u32::MAX as u64;

impl Field {
    fn name(&self) -> &'static str {
        match self {
            Field::Text(name) | Field::Int(name, _) => name,
        }
    }
}

struct RecordType {
    name: &'static str,
    code: u16,
    fields: &'static [Field],
}

use Field::{Int, Text};

const TYPES: &[RecordType] = &[
    RecordType { name: "A", code: 1, fields: &[Text("address")] },
    RecordType { name: "NS", code: 2, fields: &[Text("nsdname")] },
    RecordType { name: "CNAME", code: 5, fields: &[Text("cname")] },
    RecordType {
        name: "SOA",
        code: 6,
        fields: &[
            Text("mname"),
            Text("rname"),
            Int("serial", U32),
            Int("refresh", U32),
            Int("retry", U32),
            Int("expire", U32),
            Int("minimum", U32),
        ],
    },
    RecordType { name: "PTR", code: 12, fields: &[Text("ptrdname")] },
    RecordType { name: "HINFO", code: 13, fields: &[Text("cpu"), Text("os")] },
    RecordType { name: "MX", code: 15, fields: &[Int("preference", U16), Text("exchange")] },
    RecordType { name: "TXT", code: 16, fields: &[Text("txtdata")] },
    RecordType { name: "AAAA", code: 28, fields: &[Text("address")] },
    RecordType {
        name: "SRV",
        code: 33,
        fields: &[Int("priority", U16), Int("weight", U16), Int("port", U16), Text("target")],
    },
    RecordType {
        name: "NAPTR",
        code: 35,
        fields: &[
            Int("order", U16),
            Int("preference", U16),
            Text("flags"),
            Text("services"),
            Text("regexp"),
            Text("replacement"),
        ],
    },
    RecordType {
        name: "SSHFP",
        code: 44,
        fields: &[Int("algorithm", U8), Int("fptype", U8), Text("fingerprint")],
    },
    RecordType { name: "SPF", code: 99, fields: &[Text("txtdata")] },
];

/// Field name used for types outside the table.
pub const GENERIC_RDATA: &str = "rdata";

fn by_code(code: u16) -> Option<&'static RecordType> {
    TYPES.iter().find(|t| t.code == code)
}

fn by_name(name: &str) -> Option<&'static RecordType> {
    TYPES.iter().find(|t| t.name == name)
}

pub fn type_code(name: &str) -> Option<u16> {
    by_name(name).map(|t| t.code)
}

/// Name for a type code. Codes outside the table are named `TYPE<code>`.
pub fn type_name(code: u16) -> String {
    by_code(code)
        .map(|t| t.name.to_string())
        .unwrap_or_else(|| format!("TYPE{code}"))
}

pub fn supported_types() -> Vec<&'static str> {
    TYPES.iter().map(|t| t.name).collect()
}

/// Turns positional wire fields into a canonical rdata map. Unknown codes are
/// kept as a single space-joined `rdata` field.
pub fn decode(code: u16, fields: &[String]) -> Result<(String, Rdata)> {
    let Some(record_type) = by_code(code) else {
        let mut rdata = Rdata::new();
        rdata.insert(GENERIC_RDATA.into(), Value::String(fields.join(" ")));
        return Ok((type_name(code), rdata));
    };

    if fields.len() < record_type.fields.len() {
        return ResponseSnafu {
            message: format!(
                "{} record has {} fields, expected {}",
                record_type.name,
                fields.len(),
                record_type.fields.len()
            ),
        }
        .fail();
    }

    let mut rdata = Rdata::new();
    for (field, raw) in record_type.fields.iter().zip(fields) {
        let value = match field {
            Text(_) => Value::String(raw.clone()),
            Int(name, _) => {
                let number: u64 = raw.trim().parse().map_err(|_| {
                    ResponseSnafu {
                        message: format!("{} field {name} is not an integer: {raw}", record_type.name),
                    }
                    .build()
                })?;
                Value::from(number)
            }
        };
        rdata.insert(field.name().to_string(), value);
    }
    Ok((record_type.name.to_string(), rdata))
}

/// Turns a canonical rdata map into the type code and positional fields the
/// backend expects.
pub fn encode(kind: &str, rdata: &Rdata) -> Result<(u16, Vec<String>)> {
    let record_type = by_name(kind).with_context(|| NotFoundSnafu {
        message: format!(
            "record type {kind} is not supported; supported types: {}",
            supported_types().join(", ")
        ),
    })?;

    let mut fields = Vec::with_capacity(record_type.fields.len());
    for field in record_type.fields {
        let value = rdata.get(field.name()).with_context(|| InvalidInputSnafu {
            message: format!("{kind} rdata is missing {}", field.name()),
        })?;
        fields.push(encode_value(kind, *field, value)?);
    }
    Ok((record_type.code, fields))
}

fn encode_value(kind: &str, field: Field, value: &Value) -> Result<String> {
    let encoded = match (field, value) {
        (Text(_), Value::String(s)) => Some(s.clone()),
        (Text(_), Value::Number(n)) => Some(n.to_string()),
        (Int(_, max), Value::Number(n)) => {
            n.as_u64().filter(|n| *n <= max).map(|n| n.to_string())
        }
        (Int(_, max), Value::String(s)) => s
            .trim()
            .parse::<u64>()
            .ok()
            .filter(|n| *n <= max)
            .map(|n| n.to_string()),
        _ => None,
    };
    encoded.with_context(|| InvalidInputSnafu {
        message: format!("{kind} field {} has an invalid value {value}", field.name()),
    })
}

/// Shorthand rdata constructors.
pub mod rdata {
    use serde_json::json;

    use crate::common::Rdata;

    fn map(pairs: Vec<(&str, serde_json::Value)>) -> Rdata {
        pairs.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
    }

    pub fn a(address: &str) -> Rdata {
        map(vec![("address", json!(address))])
    }

    pub fn aaaa(address: &str) -> Rdata {
        map(vec![("address", json!(address))])
    }

    pub fn cname(cname: &str) -> Rdata {
        map(vec![("cname", json!(cname))])
    }

    pub fn mx(preference: u16, exchange: &str) -> Rdata {
        map(vec![("preference", json!(preference)), ("exchange", json!(exchange))])
    }

    pub fn txt(txtdata: &str) -> Rdata {
        map(vec![("txtdata", json!(txtdata))])
    }

    pub fn srv(priority: u16, weight: u16, port: u16, target: &str) -> Rdata {
        map(vec![
            ("priority", json!(priority)),
            ("weight", json!(weight)),
            ("port", json!(port)),
            ("target", json!(target)),
        ])
    }
}
