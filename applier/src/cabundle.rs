use base64::prelude::*;
use tracing::*;

use crate::jsonutils;
use crate::k8s::is_crd;
use crate::prelude::*;

const CA_BUNDLE_PATH: &str = "/spec/conversion/webhook/clientConfig/caBundle";

// The apiserver accepts a CRD whose conversion webhook carries a garbage
// caBundle and then every conversion breaks at runtime; strip bundles that
// provably can't serve as a TLS root before submission.  Anything that parses
// is preserved verbatim -- this is a tripwire, not a validator.
pub fn sanitize_conversion_webhook(obj: &mut DynamicObject) {
    if !is_crd(obj) {
        return;
    }

    let valid = match obj.data.pointer(CA_BUNDLE_PATH).and_then(|v| v.as_str()) {
        Some(bundle) => is_usable_ca_bundle(bundle),
        None => return,
    };

    if !valid {
        debug!("removing invalid conversion webhook caBundle from {}", obj.name_any());
        jsonutils::remove_path(&mut obj.data, CA_BUNDLE_PATH);
    }
}

fn is_usable_ca_bundle(encoded: &str) -> bool {
    let Ok(bytes) = BASE64_STANDARD.decode(encoded) else {
        return false;
    };

    let mut reader: &[u8] = &bytes;
    let mut found_cert = false;
    for item in rustls_pemfile::certs(&mut reader) {
        match item {
            Ok(_) => found_cert = true,
            Err(_) => return false,
        }
    }
    found_cert
}
