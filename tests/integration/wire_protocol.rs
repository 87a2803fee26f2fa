//! Report layouts observed through the mock transport.

use deckhand::device::Model;
use deckhand::device::mock::Operation;
use deckhand::device::protocol::{self, InputReport};
use deckhand::persistence::MemoryStore;

use crate::common::{TEST_SERIAL, open_deck};

/// Original family keys are column-mirrored on the wire.
#[test]
fn test_original_image_goes_to_mirrored_key() {
    let layout = Model::Original.icon_layout().unwrap();
    let bitmap = vec![0u8; layout.bmp_size()];

    let reports = protocol::image_reports(Model::Original, 0, &bitmap).unwrap();

    assert_eq!(reports.len(), 2);
    for (page, report) in reports.iter().enumerate() {
        assert_eq!(report.len(), 8191);
        assert_eq!(report[0..2], [0x02, 0x01]);
        assert_eq!(report[2], page as u8 + 1);
        // logical key 0 is wire key 4, sent 1-based
        assert_eq!(report[5], 5);
    }
    assert_eq!(reports[0][4], 0);
    assert_eq!(reports[1][4], 1);
}

#[test]
fn test_original_rejects_wrong_bitmap_size() {
    assert!(protocol::image_reports(Model::Original, 3, &[0u8; 100]).is_err());
}

#[test]
fn test_gen2_image_header_carries_length_and_page() {
    let data = vec![0xabu8; 1500];
    let reports = protocol::image_reports(Model::Xl, 9, &data).unwrap();

    assert_eq!(reports.len(), 2);
    assert_eq!(reports[0][..8], [0x02, 0x07, 9, 0, 0xf8, 0x03, 0, 0]);
    // 1500 - 1016 = 484 = 0x01e4
    assert_eq!(reports[1][..8], [0x02, 0x07, 9, 1, 0xe4, 0x01, 1, 0]);
    assert!(reports.iter().all(|r| r.len() == 1024));
}

#[test]
fn test_mini_uses_zero_based_pages() {
    let data = vec![1u8; 2000];
    let reports = protocol::image_reports(Model::Mini, 2, &data).unwrap();

    assert_eq!(reports.len(), 2);
    assert_eq!(reports[0][..6], [0x02, 0x01, 0, 0, 0, 3]);
    assert_eq!(reports[1][..6], [0x02, 0x01, 1, 0, 1, 3]);
}

#[test]
fn test_pedal_has_no_image_reports() {
    assert!(protocol::image_reports(Model::Pedal, 0, &[1, 2, 3]).unwrap().is_empty());
}

#[test]
fn test_brightness_reports_per_family() {
    let gen1 = protocol::brightness_report(Model::Mini.protocol(), 0.42).unwrap();
    assert_eq!(gen1.len(), 17);
    assert_eq!(gen1[..6], [0x05, 0x55, 0xaa, 0xd1, 0x01, 42]);

    let gen2 = protocol::brightness_report(Model::Plus.protocol(), 1.0).unwrap();
    assert_eq!(gen2.len(), 32);
    assert_eq!(gen2[..3], [0x03, 0x08, 100]);

    assert!(protocol::brightness_report(Model::Pedal.protocol(), 0.5).is_none());
}

#[test]
fn test_open_original_sends_gen1_reset_and_brightness() {
    let store = MemoryStore::new();
    let (deck, mock) = open_deck(Model::Original, &store);

    let features = mock.feature_reports();
    assert_eq!(features[0][..2], [0x0b, 0x63]);
    mock.assert_contains(&Operation::SendFeature(
        protocol::brightness_report(Model::Original.protocol(), 0.5).unwrap(),
    ));
    assert_eq!(deck.serial(), TEST_SERIAL);
}

#[test]
fn test_original_button_report_is_unmirrored() {
    let mut report = vec![0u8; protocol::input_report_len(Model::Original)];
    report[0] = 0x01;
    // wire key 0 is the top right key
    report[1] = 1;

    let parsed = protocol::parse_input(Model::Original, &report).unwrap();
    let InputReport::Buttons(states) = parsed else {
        panic!("expected a button report, got {parsed:?}");
    };
    assert_eq!(states.len(), 15);
    assert!(states[4]);
    assert_eq!(states.iter().filter(|&&s| s).count(), 1);
}

#[test]
fn test_short_read_is_ignored() {
    assert!(protocol::parse_input(Model::Mk2, &[0x01, 0x00]).is_none());
    assert!(protocol::parse_input(Model::Mk2, &[]).is_none());
}
