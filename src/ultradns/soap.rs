use std::collections::BTreeMap;
use std::io::BufReader;
use std::time::Duration;

use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use snafu::ResultExt;

use super::fault::classify;
use super::models::{DirectionalGroup, DirectionalWireRecord, NameAndType, WireRecord, ZoneInfo};
use super::transport::UltraDns;
use super::xml::{self, Element};
use crate::common::{Credentials, Error, Regions, RequestSnafu, Result, Supplier};

const SOAP_ENV: &str = "http://schemas.xmlsoap.org/soap/envelope/";
const NAMESPACE: &str = "http://webservice.api.ultra.neustar.com/v01/";
const WSSE: &str =
    "http://docs.oasis-open.org/wss/2004/01/oasis-200401-wss-wssecurity-secext-1.0.xsd";
const PASSWORD_TEXT: &str =
    "http://docs.oasis-open.org/wss/2004/01/oasis-200401-wss-username-token-profile-1.0#PasswordText";

type XmlWriter = Writer<Vec<u8>>;

fn write_failed(err: impl std::fmt::Display) -> Error {
    Error::InvalidInputError {
        message: format!("Failed to write request: {err}"),
    }
}

fn start(w: &mut XmlWriter, name: &str, attributes: &[(&str, &str)]) -> Result<()> {
    let start = BytesStart::new(name).with_attributes(attributes.iter().copied());
    w.write_event(Event::Start(start)).map_err(write_failed)
}

fn end(w: &mut XmlWriter, name: &str) -> Result<()> {
    w.write_event(Event::End(BytesEnd::new(name)))
        .map_err(write_failed)
}

fn empty(w: &mut XmlWriter, name: &str, attributes: &[(&str, &str)]) -> Result<()> {
    let start = BytesStart::new(name).with_attributes(attributes.iter().copied());
    w.write_event(Event::Empty(start)).map_err(write_failed)
}

fn leaf(w: &mut XmlWriter, name: &str, attributes: &[(&str, &str)], value: &str) -> Result<()> {
    start(w, name, attributes)?;
    w.write_event(Event::Text(BytesText::new(value)))
        .map_err(write_failed)?;
    end(w, name)
}

fn text(w: &mut XmlWriter, name: &str, value: &str) -> Result<()> {
    leaf(w, name, &[], value)
}

fn transaction(w: &mut XmlWriter) -> Result<()> {
    empty(w, "transactionID", &[])
}

fn info_values(w: &mut XmlWriter, fields: &[String]) -> Result<()> {
    let names: Vec<String> = (1..=fields.len()).map(|i| format!("Info{i}Value")).collect();
    let pairs: Vec<(&str, &str)> = names
        .iter()
        .map(String::as_str)
        .zip(fields.iter().map(String::as_str))
        .collect();
    empty(w, "InfoValues", &pairs)
}

fn group_details(w: &mut XmlWriter, group: &DirectionalGroup) -> Result<()> {
    start(w, "GeolocationGroupDetails", &[("groupName", group.name.as_str())])?;
    for (region, territories) in &group.regions {
        let territories = territories
            .iter()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(";");
        empty(
            w,
            "GeolocationGroupDefinitionData",
            &[("regionName", region.as_str()), ("territoryNames", territories.as_str())],
        )?;
    }
    end(w, "GeolocationGroupDetails")
}

fn directional_configuration(
    w: &mut XmlWriter,
    attributes: &[(&str, &str)],
    rdata: &[String],
) -> Result<()> {
    start(w, "DirectionalRecordConfiguration", attributes)?;
    info_values(w, rdata)?;
    end(w, "DirectionalRecordConfiguration")
}

fn resource_record(w: &mut XmlWriter, zone_name: &str, record: &WireRecord) -> Result<()> {
    let type_code = record.type_code.to_string();
    let ttl = record.ttl.to_string();
    let mut pairs = vec![
        ("Type", type_code.as_str()),
        ("DName", record.name.as_str()),
        ("TTL", ttl.as_str()),
        ("ZoneName", zone_name),
    ];
    if !record.guid.is_empty() {
        pairs.insert(0, ("Guid", record.guid.as_str()));
    }
    start(w, "resourceRecord", &pairs)?;
    info_values(w, &record.rdata)?;
    end(w, "resourceRecord")
}

/// Writes a whole request: WS-Security header, then `operation` in the body.
fn envelope(
    credentials: &Credentials,
    operation: &str,
    write_body: impl FnOnce(&mut XmlWriter) -> Result<()>,
) -> Result<String> {
    let mut w = Writer::new(Vec::new());
    start(
        &mut w,
        "soapenv:Envelope",
        &[("xmlns:soapenv", SOAP_ENV), ("xmlns:v01", NAMESPACE)],
    )?;
    start(&mut w, "soapenv:Header", &[])?;
    start(
        &mut w,
        "wsse:Security",
        &[("soapenv:mustUnderstand", "1"), ("xmlns:wsse", WSSE)],
    )?;
    start(&mut w, "wsse:UsernameToken", &[])?;
    text(&mut w, "wsse:Username", credentials.get("username").unwrap_or_default())?;
    leaf(
        &mut w,
        "wsse:Password",
        &[("Type", PASSWORD_TEXT)],
        credentials.get("password").unwrap_or_default(),
    )?;
    end(&mut w, "wsse:UsernameToken")?;
    end(&mut w, "wsse:Security")?;
    end(&mut w, "soapenv:Header")?;

    let operation = format!("v01:{operation}");
    start(&mut w, "soapenv:Body", &[])?;
    start(&mut w, &operation, &[])?;
    write_body(&mut w)?;
    end(&mut w, &operation)?;
    end(&mut w, "soapenv:Body")?;
    end(&mut w, "soapenv:Envelope")?;
    String::from_utf8(w.into_inner()).map_err(write_failed)
}

fn fault_error(fault: xml::Fault) -> Error {
    match fault.code {
        Some(code) => classify(code, fault.description),
        None => Error::ResponseError {
            message: format!("SOAP fault: {}", fault.description),
        },
    }
}

/// The UltraDNS v01 SOAP endpoint. Endpoint and credentials are read from
/// their suppliers on every call, so rotation takes effect immediately.
pub struct SoapClient {
    agent: ureq::Agent,
    url: Supplier<String>,
    credentials: Supplier<Credentials>,
}

impl SoapClient {
    pub fn new(url: Supplier<String>, credentials: Supplier<Credentials>, timeout: Duration) -> Self {
        Self {
            agent: ureq::AgentBuilder::new().timeout(timeout).build(),
            url,
            credentials,
        }
    }

    fn call(
        &self,
        name: &str,
        write_body: impl FnOnce(&mut XmlWriter) -> Result<()>,
    ) -> Result<Vec<Element>> {
        let url = (self.url)();
        let body = envelope(&(self.credentials)(), name, write_body)?;
        tracing::debug!(url, method = name, "Sending request");

        let response = self
            .agent
            .post(&url)
            .set("Content-Type", "text/xml; charset=utf-8")
            .set("SOAPAction", "")
            .send_string(&body);
        let (status, response) = match response {
            Ok(response) => (response.status(), response),
            // faults arrive as HTTP 500 with a SOAP body
            Err(ureq::Error::Status(status, response)) => (status, response),
            Err(err) => {
                return Err(err).context(RequestSnafu {
                    url: &url,
                    method: name,
                })
            }
        };

        let elements = xml::flatten(BufReader::new(response.into_reader()))?;
        if let Some(fault) = xml::fault(&elements) {
            let err = fault_error(fault);
            tracing::debug!(method = name, status, error = %err, "Request faulted");
            return Err(err);
        }
        if status >= 300 {
            return Err(Error::ResponseError {
                message: format!("{name} returned HTTP {status} without a fault"),
            });
        }
        Ok(elements)
    }
}

impl UltraDns for SoapClient {
    fn get_accounts_list_of_user(&self) -> Result<String> {
        xml::account_id(&self.call("getAccountsListOfUser", |_| Ok(()))?)
    }

    fn get_zones_of_account(&self, account_id: &str) -> Result<Vec<ZoneInfo>> {
        let elements = self.call("getZonesOfAccount", |w| {
            text(w, "accountId", account_id)?;
            text(w, "zoneType", "all")
        })?;
        xml::zones(&elements)
    }

    fn create_primary_zone(&self, account_id: &str, zone_name: &str) -> Result<()> {
        self.call("createPrimaryZone", |w| {
            transaction(w)?;
            text(w, "accountId", account_id)?;
            text(w, "zoneName", zone_name)?;
            text(w, "forceImport", "false")
        })
        .map(|_| ())
    }

    fn delete_zone(&self, zone_name: &str) -> Result<()> {
        self.call("deleteZone", |w| {
            transaction(w)?;
            text(w, "zoneName", zone_name)
        })
        .map(|_| ())
    }

    fn get_resource_records_of_zone(&self, zone_name: &str) -> Result<Vec<WireRecord>> {
        let elements = self.call("getResourceRecordsOfZone", |w| {
            text(w, "zoneName", zone_name)?;
            text(w, "rrType", "0")
        })?;
        xml::resource_records(&elements)
    }

    fn get_resource_records_of_dname_by_type(
        &self,
        zone_name: &str,
        name: &str,
        type_code: u16,
    ) -> Result<Vec<WireRecord>> {
        let elements = self.call("getResourceRecordsOfDNameByType", |w| {
            text(w, "zoneName", zone_name)?;
            text(w, "hostName", name)?;
            text(w, "rrType", &type_code.to_string())
        })?;
        xml::resource_records(&elements)
    }

    fn create_resource_record(&self, zone_name: &str, record: &WireRecord) -> Result<String> {
        let elements = self.call("createResourceRecord", |w| {
            transaction(w)?;
            resource_record(w, zone_name, record)
        })?;
        xml::text_of(&elements, "guid")
    }

    fn update_resource_record(&self, zone_name: &str, record: &WireRecord) -> Result<()> {
        self.call("updateResourceRecord", |w| {
            transaction(w)?;
            resource_record(w, zone_name, record)
        })
        .map(|_| ())
    }

    fn delete_resource_record(&self, guid: &str) -> Result<()> {
        self.call("deleteResourceRecord", |w| {
            transaction(w)?;
            text(w, "guid", guid)
        })
        .map(|_| ())
    }

    fn get_load_balancing_pools_by_zone(
        &self,
        zone_name: &str,
    ) -> Result<BTreeMap<NameAndType, String>> {
        let elements = self.call("getLoadBalancingPoolsByZone", |w| {
            text(w, "zoneName", zone_name)?;
            text(w, "lbPoolType", "RR")
        })?;
        xml::pools(&elements)
    }

    fn get_rr_pool_records(&self, pool_id: &str) -> Result<Vec<WireRecord>> {
        let elements = self.call("getRRPoolRecords", |w| text(w, "lbPoolId", pool_id))?;
        let mut records = xml::resource_records(&elements)?;
        for record in &mut records {
            record.pool_id = Some(pool_id.to_string());
        }
        Ok(records)
    }

    fn add_rr_lb_pool(&self, zone_name: &str, name: &str, type_code: u16) -> Result<String> {
        let elements = self.call("addRRLBPool", |w| {
            transaction(w)?;
            text(w, "zoneName", zone_name)?;
            text(w, "hostName", name)?;
            text(w, "description", &super::codec::type_name(type_code))?;
            text(w, "poolRecordType", &type_code.to_string())?;
            empty(w, "rrGUID", &[])
        })?;
        xml::text_of(&elements, "RRPoolID")
    }

    fn add_record_to_rr_pool(
        &self,
        zone_name: &str,
        pool_id: &str,
        type_code: u16,
        ttl: u32,
        rdata: &str,
    ) -> Result<String> {
        let type_code = type_code.to_string();
        let ttl = ttl.to_string();
        let elements = self.call("addRecordToRRPool", |w| {
            transaction(w)?;
            empty(
                w,
                "roundRobinRecord",
                &[
                    ("lbPoolID", pool_id),
                    ("info1Value", rdata),
                    ("ZoneName", zone_name),
                    ("Type", type_code.as_str()),
                    ("TTL", ttl.as_str()),
                ],
            )
        })?;
        xml::text_of(&elements, "guid")
    }

    fn delete_lb_pool(&self, pool_id: &str) -> Result<()> {
        self.call("deleteLBPool", |w| {
            transaction(w)?;
            text(w, "lbPoolID", pool_id)?;
            text(w, "DeleteAll", "Yes")?;
            empty(w, "retainRecordId", &[])
        })
        .map(|_| ())
    }

    fn get_directional_pools_of_zone(
        &self,
        zone_name: &str,
    ) -> Result<BTreeMap<NameAndType, String>> {
        let elements = self.call("getDirectionalPoolsOfZone", |w| text(w, "zoneName", zone_name))?;
        xml::directional_pools(&elements)
    }

    fn get_directional_dns_records_for_host(
        &self,
        zone_name: &str,
        name: &str,
        type_code: u16,
    ) -> Result<Vec<DirectionalWireRecord>> {
        let elements = self.call("getDirectionalDNSRecordsForHost", |w| {
            text(w, "zoneName", zone_name)?;
            text(w, "hostName", name)?;
            text(w, "poolRecordType", &type_code.to_string())
        })?;
        xml::directional_records(&elements)
    }

    fn get_directional_dns_group_details(&self, group_id: &str) -> Result<DirectionalGroup> {
        let elements = self.call("getDirectionalDNSGroupDetails", |w| text(w, "GroupId", group_id))?;
        xml::group(&elements)
    }

    fn get_available_regions(&self) -> Result<Regions> {
        xml::regions(&self.call("getAvailableRegions", |_| Ok(()))?)
    }

    fn add_directional_pool(&self, zone_name: &str, name: &str, kind: &str) -> Result<String> {
        let elements = self.call("addDirectionalPool", |w| {
            transaction(w)?;
            empty(
                w,
                "AddDirectionalPoolData",
                &[
                    ("dirPoolType", "GEOLOCATION"),
                    ("poolRecordType", kind),
                    ("zoneName", zone_name),
                    ("hostName", name),
                    ("description", kind),
                ],
            )
        })?;
        xml::text_of(&elements, "DirPoolID")
    }

    fn add_directional_pool_record(
        &self,
        pool_id: &str,
        record: &WireRecord,
        group: &DirectionalGroup,
    ) -> Result<String> {
        let kind = super::codec::type_name(record.type_code);
        let ttl = record.ttl.to_string();
        let elements = self.call("addDirectionalPoolRecord", |w| {
            transaction(w)?;
            start(w, "AddDirectionalRecordData", &[("directionalPoolId", pool_id)])?;
            directional_configuration(
                w,
                &[("recordType", kind.as_str()), ("TTL", ttl.as_str())],
                &record.rdata,
            )?;
            start(w, "GeolocationGroupData", &[])?;
            empty(w, "GroupData", &[("groupingType", "DEFINE_NEW_GROUP")])?;
            group_details(w, group)?;
            end(w, "GeolocationGroupData")?;
            text(w, "forceOverlapTransfer", "true")?;
            end(w, "AddDirectionalRecordData")
        })?;
        xml::text_of(&elements, "DirectionalPoolRecordID")
    }

    fn update_directional_pool_record(
        &self,
        record: &DirectionalWireRecord,
        group: &DirectionalGroup,
    ) -> Result<()> {
        let ttl = record.record.ttl.to_string();
        self.call("updateDirectionalPoolRecord", |w| {
            transaction(w)?;
            start(
                w,
                "UpdateDirectionalRecordData",
                &[("directionalPoolRecordId", record.record.guid.as_str())],
            )?;
            directional_configuration(w, &[("TTL", ttl.as_str())], &record.record.rdata)?;
            group_details(w, group)?;
            text(w, "forceOverlapTransfer", "true")?;
            end(w, "UpdateDirectionalRecordData")
        })
        .map(|_| ())
    }

    fn delete_directional_pool_record(&self, record_id: &str) -> Result<()> {
        self.call("deleteDirectionalPoolRecord", |w| {
            transaction(w)?;
            text(w, "dirPoolRecordId", record_id)
        })
        .map(|_| ())
    }
}
