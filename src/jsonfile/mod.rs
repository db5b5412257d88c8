//! Desired record sets kept in a JSON file.

use std::{fs::File, io::BufReader, path::Path};

use snafu::ResultExt;

use crate::common::{FileSnafu, InvalidInputSnafu, ResourceRecordSet, Result};

fn normalize(rrset: &mut ResourceRecordSet) -> Result<()> {
    rrset.kind.make_ascii_uppercase();
    if !rrset.name.ends_with('.') {
        rrset.name.push('.');
    }
    url::Host::parse(rrset.name.trim_end_matches('.'))
        .boxed()
        .context(FileSnafu {
            message: format!("Failed to parse record name {}", rrset.name),
        })?;
    Ok(())
}

/// Reads a JSON array of record sets. Type names are upper-cased and names
/// made fully qualified.
pub fn read_record_sets(path: &Path) -> Result<Vec<ResourceRecordSet>> {
    let file = File::open(path).boxed().context(FileSnafu {
        message: format!("Failed to open source {}", path.display()),
    })?;

    let reader = BufReader::new(file);
    let mut rrsets: Vec<ResourceRecordSet> =
        serde_json::from_reader(reader).boxed().context(FileSnafu {
            message: format!("Failed to read record sets from {}", path.display()),
        })?;

    for rrset in rrsets.iter_mut() {
        normalize(rrset)?;
    }
    for (index, rrset) in rrsets.iter().enumerate() {
        if rrsets[..index].iter().any(|other| other.matches(rrset)) {
            return InvalidInputSnafu {
                message: format!(
                    "{} {} {} is listed twice",
                    rrset.name,
                    rrset.kind,
                    rrset.qualifier.as_deref().unwrap_or("")
                ),
            }
            .fail();
        }
    }

    tracing::info!(
        source = %path.display(),
        record_sets = rrsets.len(),
        "Read completed",
    );
    Ok(rrsets)
}
