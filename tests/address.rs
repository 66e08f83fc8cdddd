use excel_cpu_rs::{Address, AddressStyle, AddrError};

const STYLES: [AddressStyle; 4] = [
    AddressStyle::Decimal,
    AddressStyle::Hex,
    AddressStyle::RowCol,
    AddressStyle::Spreadsheet,
];

#[test]
fn every_address_round_trips_in_every_style() {
    for style in STYLES {
        for a in 0..=u16::MAX {
            let addr = Address(a);
            let text = style.render(addr);
            assert_eq!(style.parse(&text), Ok(addr), "{style} `{text}`");
        }
    }
}

#[test]
fn renderings_of_one_address() {
    let a = Address(0x0102);
    assert_eq!(a.row(), 1);
    assert_eq!(a.col(), 2);
    assert_eq!(a.render(AddressStyle::Decimal), "258");
    assert_eq!(a.render(AddressStyle::Hex), "0102");
    assert_eq!(a.render(AddressStyle::RowCol), "1_2");
    assert_eq!(a.render(AddressStyle::Spreadsheet), "C2");
    assert_eq!(Address(0xFFFF).to_spreadsheet(), "IV256");
    assert_eq!(Address(26).to_spreadsheet(), "AA1");
}

#[test]
fn row_col_constructor_checks_grid() {
    assert_eq!(Address::from_row_col(255, 255), Ok(Address(0xFFFF)));
    assert_eq!(
        Address::from_row_col(256, 0),
        Err(AddrError::OutsideGrid { row: 256, col: 0 })
    );
}

#[test]
fn lowercase_spreadsheet_names_are_accepted() {
    assert_eq!(AddressStyle::Spreadsheet.parse("aa1"), Ok(Address(26)));
    assert_eq!(AddressStyle::Hex.parse("ff"), Ok(Address(0xFF)));
}

#[test]
fn malformed_strings_are_rejected() {
    use AddressStyle::*;
    assert_eq!(Decimal.parse(""), Err(AddrError::Empty));
    assert!(matches!(Decimal.parse("12a"), Err(AddrError::Malformed { .. })));
    assert!(matches!(Decimal.parse("+12"), Err(AddrError::Malformed { .. })));
    assert!(matches!(Decimal.parse("65536"), Err(AddrError::OutOfRange(_))));
    assert!(matches!(Hex.parse("10000"), Err(AddrError::Malformed { .. })));
    assert!(matches!(Hex.parse("0x10"), Err(AddrError::Malformed { .. })));
    assert!(matches!(RowCol.parse("12"), Err(AddrError::Malformed { .. })));
    assert!(matches!(RowCol.parse("1_256"), Err(AddrError::OutsideGrid { .. })));
    assert!(matches!(Spreadsheet.parse("IW1"), Err(AddrError::BadColumn(_))));
    assert!(matches!(Spreadsheet.parse("ABC1"), Err(AddrError::BadColumn(_))));
    assert!(matches!(Spreadsheet.parse("12"), Err(AddrError::BadColumn(_))));
    assert!(matches!(Spreadsheet.parse("A0"), Err(AddrError::BadRow(_))));
    assert!(matches!(Spreadsheet.parse("A257"), Err(AddrError::BadRow(_))));
    assert!(matches!(Spreadsheet.parse("Bx"), Err(AddrError::BadRow(_))));
}

#[test]
fn error_messages_name_the_style() {
    let err = AddressStyle::RowCol.parse("x_1").unwrap_err();
    assert_eq!(err.to_string(), "malformed row_col address `x_1`");
}
