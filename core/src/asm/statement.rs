//! Tagged statements produced by pass 1 and the mnemonic tables both
//! passes share.

/// One word-emitting statement, carried from pass 1 to pass 2.
#[derive(Debug, Clone)]
pub struct Statement {
    /// Address the assembled word lands at.
    pub addr: u16,
    pub kind: StatementKind,
    /// Source line number, for diagnostics and the listing.
    pub line_no: usize,
    /// Statement text as written.
    pub raw: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatementKind {
    /// Literal value.
    Data(u16),
    /// Operand expression resolved in pass 2 and emitted as a word.
    DataSymbol(String),
    /// Built-in IOT mnemonic.
    Iot(String),
    /// Memory-reference instruction with an unresolved operand.
    Mem {
        op: MemOp,
        indirect: bool,
        operand: String,
    },
    /// Operate micro-instruction mnemonics; group classification happens
    /// in pass 2.
    Operate(Vec<String>),
    /// `.` - emit this statement's own address.
    EmitAddress,
}

/// The six memory-reference opcodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemOp {
    And,
    Tad,
    Isz,
    Dca,
    Jms,
    Jmp,
}

impl MemOp {
    pub fn from_mnemonic(token: &str) -> Option<Self> {
        match token.to_ascii_uppercase().as_str() {
            "AND" => Some(Self::And),
            "TAD" => Some(Self::Tad),
            "ISZ" => Some(Self::Isz),
            "DCA" => Some(Self::Dca),
            "JMS" => Some(Self::Jms),
            "JMP" => Some(Self::Jmp),
            _ => None,
        }
    }

    pub fn base(self) -> u16 {
        match self {
            Self::And => 0o0000,
            Self::Tad => 0o1000,
            Self::Isz => 0o2000,
            Self::Dca => 0o3000,
            Self::Jms => 0o4000,
            Self::Jmp => 0o5000,
        }
    }

    pub fn mnemonic(self) -> &'static str {
        match self {
            Self::And => "AND",
            Self::Tad => "TAD",
            Self::Isz => "ISZ",
            Self::Dca => "DCA",
            Self::Jms => "JMS",
            Self::Jmp => "JMP",
        }
    }
}

/// Built-in IOT mnemonics: console, line printer, RX8E, TC08.
const IOT_TABLE: &[(&str, u16)] = &[
    ("KCF", 0o6031),
    ("KSF", 0o6032),
    ("KRS", 0o6034),
    ("KRB", 0o6036),
    ("TCF", 0o6041),
    ("TSF", 0o6042),
    ("TLS", 0o6044),
    ("TLSC", 0o6046),
    ("LPCF", 0o6601),
    ("LPSF", 0o6602),
    ("LPT", 0o6604),
    ("LPTC", 0o6606),
    ("LCD", 0o6751),
    ("XDR", 0o6752),
    ("STR", 0o6753),
    ("SER", 0o6754),
    ("SDN", 0o6755),
    ("INTR", 0o6756),
    ("INIT", 0o6757),
    ("DTCA", 0o6762),
    ("DTSF", 0o6764),
    ("DTLB", 0o6766),
    ("DTXA", 0o6771),
];

pub fn iot_value(token: &str) -> Option<u16> {
    let upper = token.to_ascii_uppercase();
    IOT_TABLE
        .iter()
        .find(|(name, _)| *name == upper)
        .map(|&(_, value)| value)
}

/// Group 1 operate mnemonics and the bits they contribute (base 7000).
const GROUP1_TABLE: &[(&str, u16)] = &[
    ("NOP", 0o000),
    ("CLA", 0o200),
    ("CLL", 0o100),
    ("CMA", 0o040),
    ("CML", 0o020),
    ("RAR", 0o010),
    ("RAL", 0o004),
    ("BSW", 0o002),
    ("IAC", 0o001),
];

/// Group 2 operate mnemonics (base 7400). SPA, SNA, and SZL are
/// assembler-only aliases: each adds bit 3 on top of the base condition.
const GROUP2_TABLE: &[(&str, u16)] = &[
    ("CLA", 0o200),
    ("SMA", 0o100),
    ("SZA", 0o040),
    ("SNL", 0o020),
    ("SPA", 0o110),
    ("SNA", 0o050),
    ("SZL", 0o030),
    ("OSR", 0o004),
    ("HLT", 0o002),
];

pub fn group1_bits(token: &str) -> Option<u16> {
    let upper = token.to_ascii_uppercase();
    GROUP1_TABLE
        .iter()
        .find(|(name, _)| *name == upper)
        .map(|&(_, bits)| bits)
}

pub fn group2_bits(token: &str) -> Option<u16> {
    let upper = token.to_ascii_uppercase();
    GROUP2_TABLE
        .iter()
        .find(|(name, _)| *name == upper)
        .map(|&(_, bits)| bits)
}

/// True when the token can open an operate statement.
pub fn is_operate_mnemonic(token: &str) -> bool {
    group1_bits(token).is_some() || group2_bits(token).is_some()
}
