use dhcpscope::{
    DhcpServer, ExportServer, IpRange, OptionClass, OptionData, ScopeError, SubnetState,
};
use std::io::Cursor;
use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::Duration;

const TEST_EXPORT: &str = r#"<?xml version="1.0"?>
<dhcp server="dhcp01">
    <classes>
        <class type="vendor" name="MSFT 5.0"/>
        <class type="user" name="Phones" comment="Desk phones"/>
    </classes>
    <options>
        <option id="81"><dword>19</dword></option>
    </options>
    <scope address="192.168.1.0" mask="255.255.255.0" name="Office" comment="Main floor" delay-offer="250">
        <range start="192.168.1.10" end="192.168.1.200"/>
        <exclusion start="192.168.1.20" end="192.168.1.29"/>
        <exclusion start="192.168.1.100" end="192.168.1.109"/>
        <exclusion start="192.168.1.40" end="192.168.1.44"/>
        <reservation address="192.168.1.15" mac="00:11:22:33:44:55" type="dhcp"/>
        <reservation address="192.168.1.16" mac="00-11-22-33-44-66"/>
        <client address="192.168.1.50" mac="aa:bb:cc:dd:ee:01" name="laptop-1" expires="1700000000"/>
        <client address="192.168.1.51" mac="aa:bb:cc:dd:ee:02" name="printer"/>
        <option id="51"><dword>691200</dword></option>
        <option id="3"><ip>192.168.1.1</ip></option>
        <option id="66" class="user:Phones"><string>tftp.office.local</string></option>
    </scope>
    <scope address="10.20.0.0" mask="255.255.0.0" name="Lab" state="disabled">
        <option id="81"><dword>0</dword></option>
    </scope>
</dhcp>
"#;

fn load(page_size: u32) -> Arc<ExportServer> {
    Arc::new(
        ExportServer::parse(Cursor::new(TEST_EXPORT))
            .expect("export should parse")
            .with_page_size(page_size),
    )
}

#[test]
fn test_export_scopes_in_document_order() {
    let export = load(1);
    let server = DhcpServer::new(export.server_name(), export.clone());

    let scopes: Vec<String> = server
        .scopes()
        .map(|scope| scope.map(|s| s.to_string()))
        .collect::<Result<_, _>>()
        .expect("enumerate scopes");

    assert_eq!(scopes, vec!["[192.168.1.0/24] Office", "[10.20.0.0/16] Lab"]);
    assert_eq!(export.outstanding_buffers(), 0);
}

#[test]
fn test_export_scope_attributes() {
    let export = load(2);
    let server = DhcpServer::new("dhcp01", export.clone());
    let scope = server.scope(Ipv4Addr::new(192, 168, 1, 0)).expect("scope");

    assert_eq!(scope.comment().unwrap(), Some("Main floor"));
    assert_eq!(scope.state().unwrap(), SubnetState::Enabled);
    assert_eq!(scope.time_delay_offer().unwrap(), Duration::from_millis(250));
    assert_eq!(scope.lease_duration().unwrap(), Duration::from_secs(8 * 86_400));
    assert_eq!(
        scope.ip_range().unwrap(),
        IpRange::new(Ipv4Addr::new(192, 168, 1, 10), Ipv4Addr::new(192, 168, 1, 200))
    );

    let excluded: Vec<String> = scope
        .excluded_ip_ranges()
        .unwrap()
        .iter()
        .map(|r| r.to_string())
        .collect();
    assert_eq!(
        excluded,
        vec![
            "192.168.1.20-192.168.1.29",
            "192.168.1.100-192.168.1.109",
            "192.168.1.40-192.168.1.44",
        ]
    );

    // 0x13: enabled, downlevel, always update both.
    let dns = scope.dns_settings().unwrap();
    assert!(dns.dynamic_updates_enabled);
    assert!(dns.update_downlevel_clients);
    assert!(dns.always_update_both_records);
    assert!(!dns.cleanup_expired_records);

    assert_eq!(export.outstanding_buffers(), 0);
}

#[test]
fn test_export_reservations_and_clients() {
    let export = load(1);
    let server = DhcpServer::new("dhcp01", export.clone());
    let scope = server.scope(Ipv4Addr::new(192, 168, 1, 0)).expect("scope");

    let reservations = scope
        .reservations()
        .collect::<Result<Vec<_>, _>>()
        .expect("reservations");
    assert_eq!(reservations.len(), 2);
    assert_eq!(reservations[0].address, Ipv4Addr::new(192, 168, 1, 15));
    assert_eq!(
        dhcpscope::format_hardware_address(&reservations[1].hardware_address),
        "00:11:22:33:44:66"
    );

    let clients = scope
        .clients()
        .collect::<Result<Vec<_>, _>>()
        .expect("clients");
    assert_eq!(clients.len(), 2);
    assert_eq!(clients[0].name.as_deref(), Some("laptop-1"));
    assert!(clients[0].lease_expires.is_some());
    assert!(clients[1].lease_expires.is_none());

    assert_eq!(export.outstanding_buffers(), 0);
}

#[test]
fn test_export_options_by_class() {
    let export = load(1);
    let server = DhcpServer::new("dhcp01", export.clone());
    let scope = server.scope(Ipv4Addr::new(192, 168, 1, 0)).expect("scope");

    let values = scope
        .all_option_values()
        .collect::<Result<Vec<_>, _>>()
        .expect("option values");
    let ids: Vec<(OptionClass, u32)> = values
        .iter()
        .map(|v| (v.class.clone(), v.value.option_id))
        .collect();
    assert_eq!(
        ids,
        vec![
            (OptionClass::Default, 51),
            (OptionClass::Default, 3),
            (OptionClass::User("Phones".to_string()), 66),
        ]
    );
    assert_eq!(
        values[2].value.data,
        vec![OptionData::String("tftp.office.local".to_string())]
    );

    let phones = scope
        .option_value(&OptionClass::User("Phones".to_string()), 66)
        .unwrap();
    assert!(phones.is_some());
    assert!(scope.default_option_value(66).unwrap().is_none());

    assert_eq!(export.outstanding_buffers(), 0);
}

#[test]
fn test_export_scope_without_range() {
    let export = load(10);
    let server = DhcpServer::new("dhcp01", export.clone());
    let scope = server.scope(Ipv4Addr::new(10, 20, 0, 0)).expect("scope");

    assert!(matches!(scope.ip_range(), Err(ScopeError::NotFound(_))));
    assert!(scope.excluded_ip_ranges().unwrap().is_empty());
    assert_eq!(scope.lease_duration().unwrap(), Duration::ZERO);
    assert!(!scope.state().unwrap().is_enabled());
    assert!(!scope.dns_settings().unwrap().dynamic_updates_enabled);
    assert_eq!(export.outstanding_buffers(), 0);
}

#[test]
fn test_export_wrong_server_name_fails() {
    let export = load(10);
    let server = DhcpServer::new("dhcp02", export.clone());

    let err = server.scopes().next().expect("one result").unwrap_err();
    assert_eq!(err.to_string(), "DhcpEnumSubnets failed with status SERVER_UNAVAILABLE (1722)");
}
