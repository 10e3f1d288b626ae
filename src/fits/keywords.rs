//! Header keyword and column type helpers used by table metadata writers.

/// Structural keys a table writer manages itself
const RESERVED_KEYS: [&str; 20] = [
    "DATASUM", "END", "EXTNAME", "PCOUNT", "NAXIS", "NAXIS1", "NAXIS2", "RAWSUM", "SIMPLE",
    "TFIELDS", "THEAP", "XTENSION", "ZHEAPPTR", "ZNAXIS1", "ZNAXIS2", "ZPCOUNT", "ZRATIO",
    "ZSHRINK", "ZTABLE", "ZTILELEN",
];

/// Per-column key families, matched on their first five characters
const RESERVED_PREFIXES: [&str; 5] = ["TFORM", "TUNIT", "TTYPE", "ZCTYP", "ZFORM"];

/// Whether a user-supplied key would clobber a structural one (case-sensitive)
pub fn is_reserved_keyword(key: &str) -> bool {
    if RESERVED_KEYS.contains(&key) {
        return true;
    }

    match key.get(..5) {
        Some(prefix) => RESERVED_PREFIXES.contains(&prefix),
        None => false,
    }
}

/// Comment describing a column type code, empty for unknown codes
pub fn comment_from_type(type_code: char) -> &'static str {
    match type_code {
        'L' => "[1-byte BOOL]",
        'A' => "[1-byte CHAR]",
        'B' => "[1-byte BOOL]",
        'I' => "[2-byte INT]",
        'J' => "[4-byte INT]",
        'K' => "[8-byte INT]",
        'E' => "[4-byte FLOAT]",
        'D' => "[8-byte FLOAT]",
        'Q' => "[var. Length]",
        _ => "",
    }
}

/// Element size of a column type code in bytes, 0 for unknown codes
pub fn size_from_type(type_code: char) -> u32 {
    match type_code {
        'L' | 'A' | 'B' => 1,
        'I' => 2,
        'J' | 'E' => 4,
        'K' | 'D' => 8,
        // Variable-length array descriptor
        'Q' => 16,
        _ => 0,
    }
}
