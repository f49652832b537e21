//! SIP status codes
//!
//! Only the codes this layer produces or branches on. The demultiplexer
//! synthesizes 481 for requests matching no dialog and 482 for merged
//! duplicate requests; everything else is classified by code class.

use std::fmt;

use serde::{Deserialize, Serialize};

/// SIP response status codes used by the demultiplexing layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u16)]
pub enum StatusCode {
    /// 100 Trying
    Trying = 100,
    /// 180 Ringing
    Ringing = 180,
    /// 200 OK
    Ok = 200,
    /// 202 Accepted
    Accepted = 202,
    /// 401 Unauthorized
    Unauthorized = 401,
    /// 404 Not Found
    NotFound = 404,
    /// 407 Proxy Authentication Required
    ProxyAuthenticationRequired = 407,
    /// 481 Call/Transaction Does Not Exist
    CallOrTransactionDoesNotExist = 481,
    /// 482 Loop Detected
    LoopDetected = 482,
    /// 486 Busy Here
    BusyHere = 486,
    /// 500 Server Internal Error
    ServerInternalError = 500,
    /// 603 Decline
    Decline = 603,
}

impl StatusCode {
    /// Numeric value of the status code
    pub fn as_u16(&self) -> u16 {
        *self as u16
    }

    /// Standard reason phrase
    pub fn reason_phrase(&self) -> &'static str {
        match self {
            StatusCode::Trying => "Trying",
            StatusCode::Ringing => "Ringing",
            StatusCode::Ok => "OK",
            StatusCode::Accepted => "Accepted",
            StatusCode::Unauthorized => "Unauthorized",
            StatusCode::NotFound => "Not Found",
            StatusCode::ProxyAuthenticationRequired => "Proxy Authentication Required",
            StatusCode::CallOrTransactionDoesNotExist => "Call/Transaction Does Not Exist",
            StatusCode::LoopDetected => "Loop Detected",
            StatusCode::BusyHere => "Busy Here",
            StatusCode::ServerInternalError => "Server Internal Error",
            StatusCode::Decline => "Decline",
        }
    }

    /// `true` for 1xx responses
    pub fn is_provisional(&self) -> bool {
        (100..200).contains(&self.as_u16())
    }

    /// `true` for 2xx responses
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.as_u16())
    }

    /// `true` for any final response (2xx and above)
    pub fn is_final(&self) -> bool {
        self.as_u16() >= 200
    }

    /// `true` for 3xx and above
    pub fn is_failure(&self) -> bool {
        self.as_u16() >= 300
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.as_u16(), self.reason_phrase())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_code_classes() {
        assert!(StatusCode::Trying.is_provisional());
        assert!(!StatusCode::Trying.is_final());
        assert!(StatusCode::Ok.is_success());
        assert!(StatusCode::Ok.is_final());
        assert!(StatusCode::CallOrTransactionDoesNotExist.is_failure());
        assert_eq!(StatusCode::LoopDetected.as_u16(), 482);
    }
}
