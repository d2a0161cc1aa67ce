use super::*;

#[test]
/// Standard CRC-16/CCITT-FALSE check value.
fn test_check_value() {
    let mut crc = TransferCrc::default();
    crc.add_bytes(b"123456789");
    assert_eq!(crc.get(), 0x29B1);
}

#[test]
/// Seeding with a signature is the same as feeding its little-endian bytes.
fn test_signature_seed() {
    let signature = 0x0F08_68D0_C1A7_C6F1u64;
    let seeded = TransferCrc::with_signature(signature);

    let mut manual = TransferCrc::default();
    manual.add_bytes(&[0xF1, 0xC6, 0xA7, 0xC1, 0xD0, 0x68, 0x08, 0x0F]);
    assert_eq!(seeded, manual);
    assert_ne!(seeded, TransferCrc::default());
}

#[test]
/// Incremental feeding matches one-shot feeding.
fn test_incremental() {
    let data = [0x10u8, 0x20, 0x30, 0x40, 0x50];
    let mut whole = TransferCrc::with_signature(42);
    whole.add_bytes(&data);

    let mut split = TransferCrc::with_signature(42);
    split.add_bytes(&data[..2]);
    split.add_bytes(&data[2..]);
    assert_eq!(whole.get(), split.get());
}
