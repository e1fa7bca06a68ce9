//! REST / SOAP classification of incoming requests.

use super::DispatchError;
use crate::matching::xml::soap_action;
use crate::mock::ServiceType;
use hyper::Method;

/// Service type and method name used for the repository lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub service_type: ServiceType,
    /// HTTP verb for REST, SOAP action for SOAP
    pub method: String,
}

fn has_media_type(content_type: &str, media_type: &str) -> bool {
    content_type
        .trim_start()
        .get(..media_type.len())
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case(media_type))
}

/// Classify a request by verb and content type.
///
/// GET and `application/json` requests are REST; `text/xml` requests are SOAP
/// and named after the operation element inside the envelope body.
pub fn classify(
    method: &Method,
    content_type: Option<&str>,
    body: &str,
) -> Result<Classification, DispatchError> {
    let content_type = content_type.unwrap_or("");

    if *method == Method::GET || has_media_type(content_type, "application/json") {
        return Ok(Classification {
            service_type: ServiceType::Rest,
            method: method.as_str().to_string(),
        });
    }

    if has_media_type(content_type, "text/xml") {
        let action = soap_action(body).map_err(DispatchError::SoapAction)?;
        return Ok(Classification {
            service_type: ServiceType::Soap,
            method: action,
        });
    }

    Err(DispatchError::Classification(content_type.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const ENVELOPE: &str = r#"<soap:Envelope xmlns:soap="http://schemas.xmlsoap.org/soap/envelope/"><soap:Body><m:GetQuoteRequest xmlns:m="urn:quotes"/></soap:Body></soap:Envelope>"#;

    #[test]
    fn test_get_is_rest_regardless_of_content_type() {
        let c = classify(&Method::GET, Some("text/plain"), "").unwrap();
        assert_eq!(c.service_type, ServiceType::Rest);
        assert_eq!(c.method, "GET");

        let c = classify(&Method::GET, None, "").unwrap();
        assert_eq!(c.service_type, ServiceType::Rest);
    }

    #[test]
    fn test_json_content_type_is_rest() {
        let c = classify(&Method::PUT, Some("Application/JSON; charset=utf-8"), "{}").unwrap();
        assert_eq!(c.service_type, ServiceType::Rest);
        assert_eq!(c.method, "PUT");
    }

    #[test]
    fn test_xml_content_type_is_soap() {
        let c = classify(&Method::POST, Some("text/xml; charset=utf-8"), ENVELOPE).unwrap();
        assert_eq!(c.service_type, ServiceType::Soap);
        assert_eq!(c.method, "GetQuote");
    }

    #[test]
    fn test_malformed_envelope() {
        let err = classify(&Method::POST, Some("text/xml"), "<oops").unwrap_err();
        assert!(matches!(err, DispatchError::SoapAction(_)));
    }

    #[test]
    fn test_unknown_content_type() {
        let err = classify(&Method::POST, Some("text/plain"), "hi").unwrap_err();
        assert!(matches!(err, DispatchError::Classification(ref ct) if ct == "text/plain"));
        let err = classify(&Method::POST, None, "hi").unwrap_err();
        assert!(matches!(err, DispatchError::Classification(_)));
    }
}
