//! Vault contract ABI definitions and method selectors.
//!
//! We define a minimal ABI covering the view call we need plus the two
//! state-changing calls whose selectors identify deposits and withdrawals
//! in the explorer's transaction list.

use alloy::primitives::keccak256;
use alloy::sol;
use alloy::sol_types::SolCall;

sol! {
    #[allow(missing_docs)]
    #[sol(rpc)]
    contract IXvsVault {
        function getUserInfo(address _rewardToken, uint256 _pid, address _user)
            external
            view
            returns (uint256 amount, uint256 rewardDebt, uint256 pendingWithdrawals);

        function deposit(address _rewardToken, uint256 _pid, uint256 _amount) external;

        function executeWithdrawal(address _rewardToken, uint256 _pid) external;
    }
}

/// `deposit(address,uint256,uint256)`
pub const DEPOSIT_SELECTOR: &str = "0x0efe6a8b";

/// `executeWithdrawal(address,uint256)`
pub const WITHDRAWAL_SELECTOR: &str = "0x7ac92456";

/// Hex form (`0x` + 8 lowercase chars) of the first four bytes of keccak256(signature).
pub fn selector_of(signature: &str) -> String {
    let hash = keccak256(signature.as_bytes());
    alloy::hex::encode_prefixed(&hash[..4])
}

/// Verify that our selector constants match the bound contract calls.
/// Call this at startup to catch any signature mismatches.
pub fn verify_selectors() -> Vec<(String, bool)> {
    let checks = [
        (
            IXvsVault::depositCall::SIGNATURE,
            IXvsVault::depositCall::SELECTOR,
            DEPOSIT_SELECTOR,
        ),
        (
            IXvsVault::executeWithdrawalCall::SIGNATURE,
            IXvsVault::executeWithdrawalCall::SELECTOR,
            WITHDRAWAL_SELECTOR,
        ),
    ];

    checks
        .into_iter()
        .map(|(sig, bound, expected)| {
            let matches = alloy::hex::encode_prefixed(bound) == expected
                && selector_of(sig) == expected;
            (sig.to_string(), matches)
        })
        .collect()
}
