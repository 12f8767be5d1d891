use std::fmt;

pub use anyhow::{anyhow, bail, ensure};
use kube::core::ErrorResponse;
use lazy_static::lazy_static;
pub use paste::paste;
use regex::Regex;
pub use thiserror::Error;

use crate::k8s::{ObjectId, is_secret};
use crate::prelude::*;

pub type EmptyResult = anyhow::Result<()>;

// This macro creates an enum which derives from thiserror::Error, and also
// creates constructor functions in snake case for each of the enum variants
#[macro_export]
macro_rules! err_impl {
    (@hidden $errtype:ident, $item:ident, String) => {
        paste! {
            pub(crate) fn [<$item:snake>](in_: &str) -> anyhow::Error {
                anyhow!{$errtype::$item(in_.into())}
            }
        }
    };

    (@hidden $errtype:ident, $item:ident, $($dtype:tt)::+) => {
        paste! {
            pub(crate) fn [<$item:snake>](in_: &$($dtype)::+) -> anyhow::Error {
                anyhow!{$errtype::$item(in_.clone())}
            }
        }
    };

    ($errtype:ident,
        $(#[$errinfo:meta] $item:ident($($dtype:tt)::+),)+
    ) => {
        #[derive(Debug, Error)]
        pub enum $errtype {
            $(#[$errinfo] $item($($dtype)::+)),+
        }

        impl $errtype {
            $(err_impl! {@hidden $errtype, $item, $($dtype)::+})+
        }
    };
}

pub use err_impl;

err_impl! {InvalidObjectError,
    #[error("object has no kind or apiVersion: {0}")]
    MissingTypeMeta(String),

    #[error("object has no name: {0}")]
    MissingName(String),

    #[error("namespace required for namespaced object {0}")]
    MissingNamespace(String),
}

err_impl! {WaitError,
    #[error("timeout waiting for: [{0}]")]
    Timeout(String),

    #[error("failed early due to stalled resources: [{0}]")]
    Stalled(String),

    #[error("timeout waiting for termination of: [{0}]")]
    TerminationTimeout(String),
}

const SECRET_IMMUTABLE_MSG: &str = "invalid, error: secret data values are immutable";
const SECRET_INVALID_MSG: &str = "invalid, error: secret data is invalid";

const REASON_NOT_FOUND: &str = "NotFound";
const REASON_CONFLICT: &str = "Conflict";
const REASON_INVALID: &str = "Invalid";

lazy_static! {
    // The apiserver has no dedicated status reason for immutability; admission
    // webhooks and CEL validation rules phrase it in free text.
    static ref IMMUTABLE_RE: Regex = Regex::new(r"(?i)(is\s*immutable|immutable\s*field)").unwrap();
}

// A dry-run apply that the apiserver rejected; carries enough context to print
// a useful one-liner without the caller having to re-derive the object identity.
#[derive(Debug)]
pub struct DryRunError {
    pub subject: String,
    pub reason: String,
    pub message: String,
}

impl DryRunError {
    pub fn new(obj: &DynamicObject, id: &ObjectId, err: &kube::Error) -> DryRunError {
        let (reason, mut message) = match api_error(err) {
            Some(resp) => (resp.reason.clone(), resp.message.clone()),
            None => (String::from("Unknown"), err.to_string()),
        };

        // Secret payloads leak through apiserver validation messages, so the
        // underlying text is never echoed for Secrets.
        if is_secret(obj) {
            message = if message.to_lowercase().contains("immutable") {
                SECRET_IMMUTABLE_MSG.into()
            } else {
                SECRET_INVALID_MSG.into()
            };
        }

        let reason = match reason.as_str() {
            REASON_CONFLICT => "FieldManagerConflict".into(),
            _ => reason,
        };

        DryRunError { subject: id.to_string(), reason, message }
    }
}

impl fmt::Display for DryRunError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.reason == REASON_NOT_FOUND {
            // The usual culprit is applying into a namespace that doesn't exist yet
            if self.message.contains("namespaces \"") {
                return write!(f, "{} namespace not found", self.subject);
            }
            return write!(f, "{} not found", self.subject);
        }
        write!(f, "{} dry-run failed ({}): {}", self.subject, self.reason, self.message)
    }
}

impl std::error::Error for DryRunError {}

pub fn api_error(err: &kube::Error) -> Option<&ErrorResponse> {
    match err {
        kube::Error::Api(resp) => Some(resp),
        _ => None,
    }
}

pub fn is_not_found(err: &kube::Error) -> bool {
    matches!(err, kube::Error::Api(ErrorResponse { code: 404, .. }))
}

// Immutable-field rejections are actionable (delete + recreate) rather than
// fatal, so they get their own classifier.  Conflict/Invalid status reasons
// are how the apiserver reports them; the regex catches admission webhooks
// and CEL rules that only say so in the message.
pub fn is_immutable_error(err: &kube::Error) -> bool {
    match api_error(err) {
        Some(resp) => {
            resp.reason == REASON_CONFLICT || resp.reason == REASON_INVALID || IMMUTABLE_RE.is_match(&resp.message)
        },
        None => false,
    }
}
