#![allow(dead_code)]

use std::sync::Arc;

use apphost::application::{AcceptAll, ApplicationLogic, HostedApplication};
use apphost::config::{ApplicationConfig, HostConfig};
use apphost::host::Host;
use apphost::storage::FilesystemStorage;
use dah::{AvailableData, ObjectDescriptor, ObjectLocator, PeerEndpoint, Patient, Series, Study};
use tempfile::TempDir;
use uuid::Uuid;

pub const EXPLICIT_VR_LE: &str = "1.2.840.10008.1.2.1";

pub fn host_config(exit_timeout_ms: u64) -> HostConfig {
    HostConfig {
        url: "http://127.0.0.1:0/Host".to_string(),
        // Replaced once the application is bound.
        application_url: "http://127.0.0.1:9/Application".to_string(),
        exit_timeout_ms,
        ..Default::default()
    }
}

pub async fn start_host(dir: &TempDir, exit_timeout_ms: u64) -> Host {
    let storage = FilesystemStorage::new(dir.path()).expect("storage");
    Host::start(host_config(exit_timeout_ms), Arc::new(storage))
        .await
        .expect("host starts")
}

pub async fn start_application(host: &Host, logic: Option<Arc<dyn ApplicationLogic>>) -> HostedApplication {
    let config = ApplicationConfig {
        url: "http://127.0.0.1:0/Application".to_string(),
        host_url: host.url().to_string(),
        ..Default::default()
    };
    let application = match logic {
        Some(logic) => HostedApplication::start_with_logic(config, logic).await,
        None => HostedApplication::start(config).await,
    }
    .expect("application starts");

    host.attach_application(PeerEndpoint::new(application.url().clone()))
        .await
        .expect("application attaches");
    application
}

/// Host and application wired to each other, application accepting everything
pub async fn start_pair(dir: &TempDir) -> (Host, HostedApplication) {
    let host = start_host(dir, 2_000).await;
    let application = start_application(&host, Some(Arc::new(AcceptAll))).await;
    (host, application)
}

pub fn descriptor(modality: &str) -> ObjectDescriptor {
    ObjectDescriptor {
        descriptor_id: Uuid::new_v4(),
        mime_type: "application/dicom".to_string(),
        class_uid: "1.2.840.10008.5.1.4.1.1.2".to_string(),
        transfer_syntax_uid: EXPLICIT_VR_LE.to_string(),
        modality: modality.to_string(),
    }
}

/// One patient, one study, one series holding `descriptor`
pub fn single_series(patient_id: &str, study_uid: &str, descriptor: ObjectDescriptor) -> AvailableData {
    AvailableData {
        descriptors: vec![],
        patients: vec![Patient {
            name: "DOE^JANE".to_string(),
            id: patient_id.to_string(),
            assigning_authority: "HOSPITAL".to_string(),
            sex: "F".to_string(),
            birth_date: "19700101".to_string(),
            descriptors: vec![],
            studies: vec![Study {
                study_uid: study_uid.to_string(),
                descriptors: vec![],
                series: vec![Series {
                    series_uid: format!("{}.1", study_uid),
                    descriptors: vec![descriptor],
                }],
            }],
        }],
    }
}

pub fn locator_for(descriptor: &ObjectDescriptor, source: Uuid) -> ObjectLocator {
    ObjectLocator::whole(
        descriptor.descriptor_id,
        source,
        EXPLICIT_VR_LE,
        format!("file:///data/{}.dcm", descriptor.descriptor_id),
    )
}
