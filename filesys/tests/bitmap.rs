use filesys::{Bitmap, SectorId};

#[test]
fn find_takes_lowest_clear_bit() {
    let mut bitmap = Bitmap::new(100);
    bitmap.mark(SectorId::new(0));
    bitmap.mark(SectorId::new(2));

    assert_eq!(bitmap.find(), Some(SectorId::new(1)));
    assert_eq!(bitmap.find(), Some(SectorId::new(3)));
    assert!(bitmap.test(SectorId::new(3)));

    bitmap.clear(SectorId::new(1));
    assert_eq!(bitmap.find(), Some(SectorId::new(1)));
    assert_eq!(bitmap.num_clear(), 100 - 4);
}

#[test]
fn find_crosses_group_boundary() {
    let mut bitmap = Bitmap::new(130);
    for i in 0..64 {
        bitmap.mark(SectorId::new(i));
    }
    assert_eq!(bitmap.find(), Some(SectorId::new(64)));
}

#[test]
fn full_bitmap_yields_nothing() {
    let mut bitmap = Bitmap::new(70);
    for i in 0..70 {
        assert_eq!(bitmap.find(), Some(SectorId::new(i)));
    }
    assert_eq!(bitmap.find(), None);
    assert_eq!(bitmap.num_clear(), 0);
}

#[test]
#[should_panic(expected = "out of bitmap range")]
fn mark_out_of_range() {
    Bitmap::new(10).mark(SectorId::new(10));
}

#[test]
fn bytes_keep_every_bit() {
    let mut bitmap = Bitmap::new(100);
    for i in [0, 7, 8, 63, 64, 99] {
        bitmap.mark(SectorId::new(i));
    }

    let bytes = bitmap.to_bytes();
    assert_eq!(bytes.len(), 13);
    assert_eq!(bytes[0], 0b1000_0001);
    assert_eq!(bytes[1], 0b0000_0001);
    assert_eq!(Bitmap::from_bytes(100, &bytes), bitmap);
}

#[test]
fn bytes_past_the_end_are_ignored() {
    let bitmap = Bitmap::from_bytes(4, &[0xff]);
    assert_eq!(bitmap.num_clear(), 0);
    assert_eq!(bitmap.to_bytes(), [0x0f]);
}
