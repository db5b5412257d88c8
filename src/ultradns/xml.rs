//! Response decoding. Bodies are flattened into a list of elements in
//! document order, then each extractor picks the elements it knows.

use std::collections::BTreeMap;
use std::io::BufRead;

use chrono::{DateTime, Utc};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use snafu::OptionExt;

use super::codec;
use super::models::{DirectionalGroup, DirectionalWireRecord, NameAndType, WireRecord, ZoneInfo};
use crate::common::{Error, Regions, ResponseSnafu, Result, RECORD_KIND_A};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(super) struct Element {
    /// Local name, namespace prefix removed.
    pub name: String,
    pub attributes: BTreeMap<String, String>,
    pub text: String,
}

impl Element {
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .get(name)
            .map(String::as_str)
            .filter(|value| !value.is_empty())
    }

    fn required(&self, name: &str) -> Result<&str> {
        self.attr(name).with_context(|| ResponseSnafu {
            message: format!("{} is missing attribute {name}", self.name),
        })
    }
}

fn malformed(err: impl std::fmt::Display) -> Error {
    Error::ResponseError {
        message: format!("Malformed XML response: {err}"),
    }
}

fn local_name(qualified: &[u8]) -> String {
    let local = match qualified.iter().rposition(|b| *b == b':') {
        Some(colon) => &qualified[colon + 1..],
        None => qualified,
    };
    String::from_utf8_lossy(local).into_owned()
}

fn element(start: &BytesStart) -> Result<Element> {
    let mut attributes = BTreeMap::new();
    for attribute in start.attributes() {
        let attribute = attribute.map_err(malformed)?;
        let value = attribute.unescape_value().map_err(malformed)?;
        attributes.insert(local_name(attribute.key.as_ref()), value.into_owned());
    }
    Ok(Element {
        name: local_name(start.name().as_ref()),
        attributes,
        text: String::new(),
    })
}

/// Decodes straight from the response stream; bodies of large zones are
/// not buffered whole.
pub(super) fn flatten<R: BufRead>(body: R) -> Result<Vec<Element>> {
    let mut reader = Reader::from_reader(body);
    reader.config_mut().trim_text(true);

    let mut elements: Vec<Element> = Vec::new();
    let mut open: Vec<usize> = Vec::new();
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_event_into(&mut buf).map_err(malformed)? {
            Event::Start(start) => {
                elements.push(element(&start)?);
                open.push(elements.len() - 1);
            }
            Event::Empty(start) => elements.push(element(&start)?),
            Event::End(_) => {
                open.pop();
            }
            Event::Text(text) => {
                if let Some(&index) = open.last() {
                    elements[index]
                        .text
                        .push_str(&text.unescape().map_err(malformed)?);
                }
            }
            Event::CData(data) => {
                if let Some(&index) = open.last() {
                    elements[index]
                        .text
                        .push_str(&String::from_utf8_lossy(&data.into_inner()));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(elements)
}

fn named<'a>(elements: &'a [Element], name: &'a str) -> impl Iterator<Item = &'a Element> + 'a {
    elements.iter().filter(move |e| e.name == name)
}

/// `Info1Value`, `Info2Value`, ... in numeric order.
fn info_values(element: &Element) -> Vec<String> {
    let mut values: Vec<(u32, String)> = element
        .attributes
        .iter()
        .filter_map(|(key, value)| {
            let index = key.strip_prefix("Info")?.strip_suffix("Value")?.parse().ok()?;
            Some((index, value.clone()))
        })
        .collect();
    values.sort();
    values.into_iter().map(|(_, value)| value).collect()
}

fn parse_u32(element: &Element, name: &str) -> Result<u32> {
    let value = element.required(name)?;
    value.parse().map_err(|_| Error::ResponseError {
        message: format!("{} attribute {name} is not a number: {value}", element.name),
    })
}

/// Record types show up either as codes or as names depending on the call.
fn parse_type_code(value: &str) -> Result<u16> {
    value
        .parse()
        .ok()
        .or_else(|| codec::type_code(&value.to_ascii_uppercase()))
        .with_context(|| ResponseSnafu {
            message: format!("unknown record type {value}"),
        })
}

fn parse_kind(value: &str) -> String {
    match value.parse::<u16>() {
        Ok(code) => codec::type_name(code),
        Err(_) => value.to_ascii_uppercase(),
    }
}

fn parse_created(value: Option<&str>) -> Option<DateTime<Utc>> {
    let value = value?;
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|created| created.with_timezone(&Utc))
}

/// `ResourceRecord` elements, each followed by its `InfoValues`.
pub(super) fn resource_records(elements: &[Element]) -> Result<Vec<WireRecord>> {
    let mut records: Vec<WireRecord> = Vec::new();
    for element in elements {
        match element.name.as_str() {
            "ResourceRecord" => {
                let mut record = WireRecord::new(
                    element.required("DName")?,
                    parse_type_code(element.required("Type")?)?,
                    parse_u32(element, "TTL")?,
                    Vec::new(),
                );
                record.guid = element.attr("Guid").unwrap_or_default().to_string();
                record.created = parse_created(element.attr("Created"));
                records.push(record);
            }
            "InfoValues" => {
                if let Some(record) = records.last_mut() {
                    record.rdata = info_values(element);
                }
            }
            _ => {}
        }
    }
    Ok(records)
}

/// Round-robin pools keyed by host name and record type.
pub(super) fn pools(elements: &[Element]) -> Result<BTreeMap<NameAndType, String>> {
    named(elements, "PoolData")
        .filter(|pool| pool.attr("PoolType").map_or(true, |kind| kind == "RD"))
        .map(|pool| {
            Ok((
                NameAndType::new(
                    pool.required("PoolDName")?,
                    parse_kind(pool.required("PoolRecordType")?),
                ),
                pool.required("PoolId")?.to_string(),
            ))
        })
        .collect()
}

/// Directional pools keyed by host name and record type. Pools listed
/// without a record type hold address records.
pub(super) fn directional_pools(elements: &[Element]) -> Result<BTreeMap<NameAndType, String>> {
    named(elements, "DirectionalPoolData")
        .map(|pool| {
            let kind = pool
                .attr("PoolRecordType")
                .map_or_else(|| RECORD_KIND_A.to_string(), parse_kind);
            Ok((
                NameAndType::new(pool.required("Pooldname")?, kind),
                pool.required("dirpoolid")?.to_string(),
            ))
        })
        .collect()
}

/// `DirectionalDNSRecordDetail` elements with their nested
/// `DirectionalDNSRecord` and `InfoValues`. The host name is usually given
/// once on the enclosing list.
pub(super) fn directional_records(elements: &[Element]) -> Result<Vec<DirectionalWireRecord>> {
    let mut records: Vec<DirectionalWireRecord> = Vec::new();
    let mut list_name = String::new();
    for element in elements {
        match element.name.as_str() {
            "DirectionalDNSRecordDetailList" => {
                list_name = element.attr("DName").unwrap_or_default().to_string();
            }
            "DirectionalDNSRecordDetail" => {
                let name = element.attr("DName").unwrap_or(&list_name);
                if name.is_empty() {
                    return ResponseSnafu {
                        message: "directional record without a host name",
                    }
                    .fail();
                }
                let mut record = WireRecord::new(name, 0, 0, Vec::new());
                record.guid = element.required("DirPoolRecordId")?.to_string();
                records.push(DirectionalWireRecord {
                    record,
                    group_id: element.attr("GeolocationGroupId").map(String::from),
                    group_name: element.attr("GeolocationGroupName").map(String::from),
                    no_response: false,
                });
            }
            "DirectionalDNSRecord" => {
                if let Some(directional) = records.last_mut() {
                    directional.record.type_code = parse_type_code(element.required("recordType")?)?;
                    directional.record.ttl = parse_u32(element, "TTL")?;
                    directional.no_response = element
                        .attr("noResponseRecord")
                        .is_some_and(|flag| flag.eq_ignore_ascii_case("true"));
                }
            }
            "InfoValues" => {
                if let Some(directional) = records.last_mut() {
                    directional.record.rdata = info_values(element);
                }
            }
            _ => {}
        }
    }
    Ok(records)
}

fn add_regions(regions: &mut Regions, element: &Element) -> Result<()> {
    let territories = regions
        .entry(element.required("RegionName")?.to_string())
        .or_default();
    territories.extend(
        element
            .attr("TerritoryName")
            .unwrap_or_default()
            .split(';')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(String::from),
    );
    Ok(())
}

pub(super) fn group(elements: &[Element]) -> Result<DirectionalGroup> {
    let detail = named(elements, "DirectionalDNSGroupDetail")
        .next()
        .with_context(|| ResponseSnafu {
            message: "response has no DirectionalDNSGroupDetail",
        })?;
    let mut regions = Regions::new();
    for region in named(elements, "DirectionalDNSRegion") {
        add_regions(&mut regions, region)?;
    }
    Ok(DirectionalGroup {
        name: detail.required("GroupName")?.to_string(),
        regions,
    })
}

pub(super) fn regions(elements: &[Element]) -> Result<Regions> {
    let mut regions = Regions::new();
    for region in named(elements, "Region") {
        add_regions(&mut regions, region)?;
    }
    Ok(regions)
}

pub(super) fn account_id(elements: &[Element]) -> Result<String> {
    named(elements, "AccountDetailsData")
        .find_map(|account| account.attr("accountID"))
        .map(String::from)
        .with_context(|| ResponseSnafu {
            message: "user has no account",
        })
}

pub(super) fn zones(elements: &[Element]) -> Result<Vec<ZoneInfo>> {
    named(elements, "UltraZone")
        .map(|zone| {
            Ok(ZoneInfo {
                name: zone.required("zoneName")?.to_string(),
                account_id: zone.attr("accountId").map(String::from),
            })
        })
        .collect()
}

/// Text of the first element called `name`, e.g. the id a create call returns.
pub(super) fn text_of(elements: &[Element], name: &str) -> Result<String> {
    named(elements, name)
        .map(|e| e.text.trim())
        .find(|text| !text.is_empty())
        .map(String::from)
        .with_context(|| ResponseSnafu {
            message: format!("response has no {name}"),
        })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct Fault {
    pub code: Option<u32>,
    pub description: String,
}

/// The fault carried by a response body, if any.
pub(super) fn fault(elements: &[Element]) -> Option<Fault> {
    let text = |name: &str| {
        named(elements, name)
            .map(|e| e.text.trim().to_string())
            .find(|t| !t.is_empty())
    };
    let code = text("errorCode");
    let fault_string = text("faultstring");
    if code.is_none() && fault_string.is_none() {
        return None;
    }
    Some(Fault {
        code: code.and_then(|c| c.parse().ok()),
        description: text("errorDescription")
            .or(fault_string)
            .unwrap_or_default(),
    })
}
