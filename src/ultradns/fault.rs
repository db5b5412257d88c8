//! Backend fault codes and their place in the error taxonomy. Faults are
//! classified here once, where a response is decoded; nothing above this
//! boundary looks at numeric codes.

use crate::common::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultCode {
    SystemError = 9999,
    ZoneNotFound = 1801,
    ZoneAlreadyExists = 1802,
    ResourceRecordNotFound = 2103,
    ResourceRecordAlreadyExists = 2111,
    DirectionalPoolNotFound = 2142,
    AccountNotFound = 2401,
    DirectionalPoolRecordNotFound = 2705,
    PoolNotFound = 2911,
    PoolAlreadyExists = 2912,
    PoolRecordNotFound = 3101,
    GroupNotFound = 4003,
    PoolRecordAlreadyExists = 4009,
}

impl FaultCode {
    pub fn from_code(code: u32) -> Option<Self> {
        use FaultCode::*;
        Some(match code {
            9999 => SystemError,
            1801 => ZoneNotFound,
            1802 => ZoneAlreadyExists,
            2103 => ResourceRecordNotFound,
            2111 => ResourceRecordAlreadyExists,
            2142 => DirectionalPoolNotFound,
            2401 => AccountNotFound,
            2705 => DirectionalPoolRecordNotFound,
            2911 => PoolNotFound,
            2912 => PoolAlreadyExists,
            3101 => PoolRecordNotFound,
            4003 => GroupNotFound,
            4009 => PoolRecordAlreadyExists,
            _ => return None,
        })
    }

    pub fn code(self) -> u32 {
        self as u32
    }
}

/// Maps a fault code and its description to exactly one error kind.
pub fn classify(code: u32, description: impl Into<String>) -> Error {
    use FaultCode::*;
    let description = description.into();
    match FaultCode::from_code(code) {
        Some(SystemError) => Error::TransientBackendError {
            code,
            description: "System Error".to_string(),
        },
        Some(
            ZoneNotFound | ResourceRecordNotFound | DirectionalPoolNotFound | AccountNotFound
            | DirectionalPoolRecordNotFound | PoolNotFound | PoolRecordNotFound | GroupNotFound,
        ) => Error::NotFoundError {
            message: format!("{code}: {description}"),
        },
        Some(ZoneAlreadyExists | ResourceRecordAlreadyExists | PoolAlreadyExists | PoolRecordAlreadyExists) => {
            Error::ConflictError {
                message: format!("{code}: {description}"),
            }
        }
        None => Error::UnclassifiedBackendError { code, description },
    }
}
