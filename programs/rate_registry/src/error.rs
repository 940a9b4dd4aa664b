use anchor_lang::prelude::*;
use anchor_lang::error::ERROR_CODE_OFFSET;

#[error_code]
pub enum RegistryError {
    #[msg("Signer is not the registry owner")]
    Unauthorized,

    #[msg("Timestamp is older than the last update")]
    StaleTimestamp,

    #[msg("Timestamp is too far ahead of ledger time")]
    FutureTimestamp,

    #[msg("Exchange rate must be non-zero")]
    InvalidRate,

    #[msg("Division by zero")]
    DivisionByZero,

    #[msg("Arithmetic overflow")]
    Overflow,

    #[msg("Delegate is not a valid registry")]
    InvalidDelegate,

    #[msg("Delegate account was not supplied")]
    DelegateAccountMissing,

    #[msg("Delegation chain exceeds the hop limit")]
    DelegationTooDeep,
}

impl RegistryError {
    const ALL: [RegistryError; 9] = [
        RegistryError::Unauthorized,
        RegistryError::StaleTimestamp,
        RegistryError::FutureTimestamp,
        RegistryError::InvalidRate,
        RegistryError::DivisionByZero,
        RegistryError::Overflow,
        RegistryError::InvalidDelegate,
        RegistryError::DelegateAccountMissing,
        RegistryError::DelegationTooDeep,
    ];

    /// Custom program error code as it appears in a failed transaction.
    pub fn code(self) -> u32 {
        self as u32 + ERROR_CODE_OFFSET
    }

    /// Decode a custom program error code back into a registry error.
    ///
    /// Off-chain clients use this to turn `InstructionError::Custom(code)`
    /// into something they can match on.
    pub fn from_code(code: u32) -> Option<Self> {
        Self::ALL.iter().copied().find(|e| e.code() == code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_round_trip() {
        for e in RegistryError::ALL {
            let decoded = RegistryError::from_code(e.code()).unwrap();
            assert_eq!(decoded.code(), e.code());
        }
        assert_eq!(RegistryError::Unauthorized.code(), 6000);
        assert!(RegistryError::from_code(42).is_none());
    }
}
