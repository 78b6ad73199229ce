//! Remote interfaces, their method names and discovery documents

use std::fmt;

use serde::{Deserialize, Serialize};

/// Query string requesting the interface definition document
pub const DEFINITION_QUERY: &str = "definition";

/// Query string requesting the record schema document
pub const SCHEMA_QUERY: &str = "definition-schema=1";

/// Placeholder replaced with the bound service URL in discovery documents
pub const SERVICE_URL_TOKEN: &str = "{{SERVICE_URL}}";

pub mod application {
    pub const GET_STATE: &str = "getState";
    pub const SET_STATE: &str = "setState";
    pub const BRING_TO_FRONT: &str = "bringToFront";

    pub const METHODS: &[&str] = &[GET_STATE, SET_STATE, BRING_TO_FRONT];
}

pub mod host {
    pub const GENERATE_UID: &str = "generateUID";
    pub const GET_AVAILABLE_SCREEN: &str = "getAvailableScreen";
    pub const GET_OUTPUT_LOCATION: &str = "getOutputLocation";
    pub const NOTIFY_STATE_CHANGED: &str = "notifyStateChanged";
    pub const NOTIFY_STATUS: &str = "notifyStatus";

    pub const METHODS: &[&str] = &[
        GENERATE_UID,
        GET_AVAILABLE_SCREEN,
        GET_OUTPUT_LOCATION,
        NOTIFY_STATE_CHANGED,
        NOTIFY_STATUS,
    ];
}

pub mod exchange {
    pub const NOTIFY_DATA_AVAILABLE: &str = "notifyDataAvailable";
    pub const GET_DATA: &str = "getData";
    pub const RELEASE_DATA: &str = "releaseData";

    pub const METHODS: &[&str] = &[NOTIFY_DATA_AVAILABLE, GET_DATA, RELEASE_DATA];
}

/// Logical interface served by one handler group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Interface {
    Application,
    Host,
    DataExchange,
}

impl Interface {
    pub fn methods(&self) -> &'static [&'static str] {
        match self {
            Interface::Application => application::METHODS,
            Interface::Host => host::METHODS,
            Interface::DataExchange => exchange::METHODS,
        }
    }

    fn definition(&self) -> &'static str {
        match self {
            Interface::Application => APPLICATION_DEFINITION,
            Interface::Host => HOST_DEFINITION,
            Interface::DataExchange => EXCHANGE_DEFINITION,
        }
    }
}

impl fmt::Display for Interface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Interface::Application => "Application",
            Interface::Host => "Host",
            Interface::DataExchange => "DataExchange",
        };
        f.write_str(name)
    }
}

const APPLICATION_DEFINITION: &str = r#"    {
      "name": "Application",
      "address": "{{SERVICE_URL}}",
      "operations": [
        { "name": "getState", "input": [], "output": "State" },
        { "name": "setState", "input": ["State"], "output": "boolean" },
        { "name": "bringToFront", "input": ["Rectangle"], "output": "boolean" }
      ]
    }"#;

const HOST_DEFINITION: &str = r#"    {
      "name": "Host",
      "address": "{{SERVICE_URL}}",
      "operations": [
        { "name": "generateUID", "input": [], "output": "string" },
        { "name": "getAvailableScreen", "input": ["Rectangle"], "output": "Rectangle" },
        { "name": "getOutputLocation", "input": ["ArrayOfString"], "output": "string" },
        { "name": "notifyStateChanged", "input": ["State"], "output": null },
        { "name": "notifyStatus", "input": ["Status"], "output": null }
      ]
    }"#;

const EXCHANGE_DEFINITION: &str = r#"    {
      "name": "DataExchange",
      "address": "{{SERVICE_URL}}",
      "operations": [
        { "name": "notifyDataAvailable", "input": ["AvailableData", "boolean"], "output": "boolean" },
        { "name": "getData", "input": ["ArrayOfUUID", "ArrayOfString", "boolean"], "output": "ArrayOfObjectLocator" },
        { "name": "releaseData", "input": ["ArrayOfUUID"], "output": null }
      ]
    }"#;

const SCHEMA: &str = r#"{
  "targetNamespace": "{{SERVICE_URL}}",
  "records": {
    "UUID": ["Uuid"],
    "ObjectDescriptor": ["DescriptorUuid", "MimeType", "ClassUID", "TransferSyntaxUID", "Modality"],
    "ObjectLocator": ["Locator", "Source", "TransferSyntax", "Offset", "Length", "URI"],
    "Series": ["SeriesUID", "ObjectDescriptors"],
    "Study": ["StudyUID", "ObjectDescriptors", "Series"],
    "Patient": ["Name", "ID", "AssigningAuthority", "Sex", "BirthDate", "ObjectDescriptors", "Studies"],
    "AvailableData": ["ObjectDescriptors", "Patients"],
    "Status": ["StatusType", "CodingSchemeDesignator", "CodeValue", "CodeMeaning"],
    "Rectangle": ["RefPointX", "RefPointY", "Width", "Height"]
  },
  "enumerations": {
    "State": ["IDLE", "INPROGRESS", "COMPLETED", "SUSPENDED", "CANCELED", "EXIT"],
    "StatusType": ["INFORMATION", "WARNING", "ERROR", "FATALERROR"]
  },
  "envelope": {
    "call": ["Method", "Params"],
    "reply": ["Result", "Fault"],
    "fault": ["Code", "Reason"]
  }
}"#;

/// Interface definition document for the given interfaces, bound to `service_url`
pub fn definition_document(interfaces: &[Interface], service_url: &str) -> String {
    let services: Vec<&str> = interfaces.iter().map(Interface::definition).collect();
    let document = format!(
        "{{\n  \"schema\": \"{}?{}\",\n  \"services\": [\n{}\n  ]\n}}",
        SERVICE_URL_TOKEN,
        SCHEMA_QUERY,
        services.join(",\n")
    );
    document.replace(SERVICE_URL_TOKEN, service_url)
}

/// Record schema document, bound to `service_url`
pub fn schema_document(service_url: &str) -> String {
    SCHEMA.replace(SERVICE_URL_TOKEN, service_url)
}
