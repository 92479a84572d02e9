//! Hosts text codec: parse, format and the parse/format round trip.

use hostgenius::hosts::{self, HostEntry};

#[test]
fn parse_expands_domains_and_keeps_comment() {
    let entries = hosts::parse("127.0.0.1 localhost\n192.168.1.1 a.com b.com # note");

    assert_eq!(
        entries,
        vec![
            HostEntry::new("127.0.0.1", "localhost"),
            HostEntry::new("192.168.1.1", "a.com").with_comment("note"),
            HostEntry::new("192.168.1.1", "b.com").with_comment("note"),
        ]
    );
    assert!(entries.iter().all(|e| e.enabled));
}

#[test]
fn parse_skips_blank_comment_and_malformed_lines() {
    let text = "\n# full line comment\n   # indented comment\n10.0.0.1\n10.0.0.2 ok.test\n\t\n";
    let entries = hosts::parse(text);

    assert_eq!(entries, vec![HostEntry::new("10.0.0.2", "ok.test")]);
}

#[test]
fn parse_handles_crlf_and_tabs() {
    let entries = hosts::parse("127.0.0.1\tlocalhost\r\n::1\t\tip6-localhost ip6-loopback\r\n");

    assert_eq!(entries.len(), 3);
    assert_eq!(entries[0].domain, "localhost");
    assert_eq!(entries[1].ip, "::1");
    assert_eq!(entries[2].domain, "ip6-loopback");
}

#[test]
fn parse_empty_trailing_comment_is_none() {
    let entries = hosts::parse("1.2.3.4 a.test #");
    assert_eq!(entries, vec![HostEntry::new("1.2.3.4", "a.test")]);
}

#[test]
fn format_renders_tabs_and_skips_disabled() {
    let mut off = HostEntry::new("10.0.0.9", "off.test");
    off.enabled = false;
    let entries = vec![
        HostEntry::new("127.0.0.1", "localhost"),
        off,
        HostEntry::new("10.0.0.1", "api.test").with_comment("staging"),
    ];

    assert_eq!(
        hosts::format(&entries),
        "127.0.0.1\tlocalhost\n10.0.0.1\tapi.test\t# staging"
    );
}

#[test]
fn format_of_nothing_is_empty() {
    assert_eq!(hosts::format(&[]), "");
}

#[test]
fn parse_format_parse_is_stable() {
    let text = "# header\n127.0.0.1 localhost\n192.168.1.1 a.com b.com # note\nbad\n10.1.1.1   c.test\t#  spaced  ";
    let once = hosts::parse(text);
    let twice = hosts::parse(&hosts::format(&once));
    assert_eq!(once, twice);
}

#[test]
fn round_trip_drops_disabled_entries() {
    let mut off = HostEntry::new("10.0.0.2", "b.test");
    off.enabled = false;
    let entries = vec![HostEntry::new("10.0.0.1", "a.test"), off];

    assert_eq!(
        hosts::parse(&hosts::format(&entries)),
        vec![HostEntry::new("10.0.0.1", "a.test")]
    );
}
