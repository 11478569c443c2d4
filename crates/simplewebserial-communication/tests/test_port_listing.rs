//! Port discovery against whatever serial hardware the host has

use simplewebserial_communication::communication::serial::list_ports;
use simplewebserial_communication::SerialPortFilter;

#[test]
fn test_list_ports_does_not_fail() {
    match list_ports(&[]) {
        Ok(ports) => {
            for port in &ports {
                assert!(!port.port_name.is_empty());
            }
        }
        Err(e) => panic!("Failed to list ports: {}", e),
    }
}

#[test]
fn test_filtered_listing_is_subset() {
    let all = list_ports(&[]).unwrap_or_default();
    // Arduino SA vendor id
    let filters = [SerialPortFilter::vendor(0x2341)];
    let filtered = list_ports(&filters).unwrap_or_default();

    assert!(filtered.len() <= all.len());
    for port in &filtered {
        assert_eq!(port.vid, Some(0x2341));
    }
}
