//! Comet (Compound V3) contract interface.
//!
//! Only the pieces the monitor needs: the principal-changing events, the
//! per-account accounting reads and the borrow index.

use alloy::primitives::B256;
use alloy::sol;
use alloy::sol_types::SolEvent;

sol! {
    /// Accrual totals returned by `totalsBasic()`.
    #[derive(Debug)]
    struct TotalsBasic {
        uint64 baseSupplyIndex;
        uint64 baseBorrowIndex;
        uint64 trackingSupplyIndex;
        uint64 trackingBorrowIndex;
        uint104 totalSupplyBase;
        uint104 totalBorrowBase;
        uint40 lastAccrualTime;
        uint8 pauseFlags;
    }

    /// Comet market interface (subset).
    #[sol(rpc)]
    interface IComet {
        event Supply(address indexed from, address indexed dst, uint256 amount);
        event Transfer(address indexed from, address indexed to, uint256 amount);
        event Withdraw(address indexed src, address indexed to, uint256 amount);
        event AbsorbDebt(address indexed absorber, address indexed borrower, uint256 basePaidOut, uint256 usdValue);

        function userBasic(address account) external view returns (
            int104 principal,
            uint64 baseTrackingIndex,
            uint64 baseTrackingAccrued,
            uint16 assetsIn,
            uint8 _reserved
        );
        function totalsBasic() external view returns (TotalsBasic memory);
        function baseIndexScale() external view returns (uint64);
        function isBorrowCollateralized(address account) external view returns (bool);
    }
}

/// Topic0 hashes of every event that moves an account's principal.
pub fn principal_event_signatures() -> Vec<B256> {
    vec![
        IComet::Supply::SIGNATURE_HASH,
        IComet::Transfer::SIGNATURE_HASH,
        IComet::Withdraw::SIGNATURE_HASH,
        IComet::AbsorbDebt::SIGNATURE_HASH,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::{keccak256, Address};
    use alloy::sol_types::SolCall;

    #[test]
    fn test_event_signatures() {
        let sigs = principal_event_signatures();
        assert_eq!(sigs.len(), 4);
        assert_eq!(sigs[0], keccak256("Supply(address,address,uint256)"));
        assert_eq!(sigs[1], keccak256("Transfer(address,address,uint256)"));
        assert_eq!(sigs[2], keccak256("Withdraw(address,address,uint256)"));
        assert_eq!(
            sigs[3],
            keccak256("AbsorbDebt(address,address,uint256,uint256)")
        );
    }

    #[test]
    fn test_call_selectors() {
        assert_eq!(hex::encode(IComet::userBasicCall::SELECTOR), "dc4abafd");
        assert_eq!(hex::encode(IComet::baseIndexScaleCall::SELECTOR), "96e7a9c1");
        assert_eq!(
            hex::encode(IComet::isBorrowCollateralizedCall::SELECTOR),
            "38aa813f"
        );

        let call = IComet::userBasicCall {
            account: Address::repeat_byte(1),
        };
        assert_eq!(call.abi_encode().len(), 4 + 32);
    }
}
