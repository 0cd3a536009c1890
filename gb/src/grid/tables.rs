//! Node tables for the supported lock-screen grids
//!
//! Labels follow TWRP's `decrypt` pattern encoding: row-major, starting at
//! `'1'` and continuing through consecutive ASCII code points (`':'`, `';'`,
//! `'<'`, ...). Neighbour lists are in row-major order and determine the
//! enumeration order, so they are spelled out rather than derived.
//!
//! 3x3 through 5x5 match TWRP's documented mapping. The 6x6 table extends the
//! same encoding and has not been confirmed against a device.

/// One node label and its neighbour labels
pub(crate) type TableRow = (char, &'static str);

pub(crate) const GRID_3: &[TableRow] = &[
    ('1', "245"),
    ('2', "13456"),
    ('3', "256"),
    ('4', "12578"),
    ('5', "12346789"),
    ('6', "23589"),
    ('7', "458"),
    ('8', "45679"),
    ('9', "568"),
];

pub(crate) const GRID_4: &[TableRow] = &[
    ('1', "256"),
    ('2', "13567"),
    ('3', "24678"),
    ('4', "378"),
    ('5', "1269:"),
    ('6', "123579:;"),
    ('7', "23468:;<"),
    ('8', "347;<"),
    ('9', "56:=>"),
    (':', "5679;=>?"),
    (';', "678:<>?@"),
    ('<', "78;?@"),
    ('=', "9:>"),
    ('>', "9:;=?"),
    ('?', ":;<>@"),
    ('@', ";<?"),
];

pub(crate) const GRID_5: &[TableRow] = &[
    ('1', "267"),
    ('2', "13678"),
    ('3', "24789"),
    ('4', "3589:"),
    ('5', "49:"),
    ('6', "127;<"),
    ('7', "12368;<="),
    ('8', "23479<=>"),
    ('9', "3458:=>?"),
    (':', "459>?"),
    (';', "67<@A"),
    ('<', "678;=@AB"),
    ('=', "789<>ABC"),
    ('>', "89:=?BCD"),
    ('?', "9:>CD"),
    ('@', ";<AEF"),
    ('A', ";<=@BEFG"),
    ('B', "<=>ACFGH"),
    ('C', "=>?BDGHI"),
    ('D', ">?CHI"),
    ('E', "@AF"),
    ('F', "@ABEG"),
    ('G', "ABCFH"),
    ('H', "BCDGI"),
    ('I', "CDH"),
];

pub(crate) const GRID_6: &[TableRow] = &[
    ('1', "278"),
    ('2', "13789"),
    ('3', "2489:"),
    ('4', "359:;"),
    ('5', "46:;<"),
    ('6', "5;<"),
    ('7', "128=>"),
    ('8', "12379=>?"),
    ('9', "2348:>?@"),
    (':', "3459;?@A"),
    (';', "456:<@AB"),
    ('<', "56;AB"),
    ('=', "78>CD"),
    ('>', "789=?CDE"),
    ('?', "89:>@DEF"),
    ('@', "9:;?AEFG"),
    ('A', ":;<@BFGH"),
    ('B', ";<AGH"),
    ('C', "=>DIJ"),
    ('D', "=>?CEIJK"),
    ('E', ">?@DFJKL"),
    ('F', "?@AEGKLM"),
    ('G', "@ABFHLMN"),
    ('H', "ABGMN"),
    ('I', "CDJOP"),
    ('J', "CDEIKOPQ"),
    ('K', "DEFJLPQR"),
    ('L', "EFGKMQRS"),
    ('M', "FGHLNRST"),
    ('N', "GHMST"),
    ('O', "IJP"),
    ('P', "IJKOQ"),
    ('Q', "JKLPR"),
    ('R', "KLMQS"),
    ('S', "LMNRT"),
    ('T', "MNS"),
];

/// Table for a grid side length, if supported
pub(crate) fn table_for(side: u32) -> Option<&'static [TableRow]> {
    match side {
        3 => Some(GRID_3),
        4 => Some(GRID_4),
        5 => Some(GRID_5),
        6 => Some(GRID_6),
        _ => None,
    }
}
