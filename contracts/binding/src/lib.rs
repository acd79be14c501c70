// Copyright 2022-2024 Protocol Labs
// SPDX-License-Identifier: Apache-2.0, MIT
//! Bindings for the EIP-2535 Diamond interfaces and the ERC-3643 facet.
//!
//! Generated from the human readable ABI rather than the build artifacts,
//! so the harness can talk to a deployed diamond without the combined
//! compilation output being present.

use ethers::contract::abigen;

abigen!(
    IDiamondCut,
    r#"[
        struct FacetCut { address facetAddress; uint8 action; bytes4[] functionSelectors; }
        function diamondCut(FacetCut[] _diamondCut, address _init, bytes _calldata) external
        event DiamondCut(FacetCut[] _diamondCut, address _init, bytes _calldata)
    ]"#
);

abigen!(
    IDiamondLoupe,
    r#"[
        struct Facet { address facetAddress; bytes4[] functionSelectors; }
        function facets() external view returns (Facet[])
        function facetFunctionSelectors(address _facet) external view returns (bytes4[])
        function facetAddresses() external view returns (address[])
        function facetAddress(bytes4 _functionSelector) external view returns (address)
    ]"#
);

abigen!(
    IDiamondInit,
    r#"[
        function init() external
    ]"#
);

abigen!(
    IERC165,
    r#"[
        function supportsInterface(bytes4 interfaceId) external view returns (bool)
    ]"#
);

// The subset of the ERC-3643 facet the harness exercises after a deployment.
abigen!(
    IERC3643,
    r#"[
        function addAgent(address _agent) external
        function removeAgent(address _agent) external
        function isAgent(address _agent) external view returns (bool)
        function isVerified(address _userAddress) external view returns (bool)
        function canTransfer(address _from, address _to, uint256 _amount) external view returns (bool)
        function mintERC3643(address _to, uint256 _amount) external
        function burnERC3643(address _userAddress, uint256 _amount) external
        function getBalance(address _userAddress) external view returns (uint256)
    ]"#
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diamond_cut_selector() {
        // The well-known EIP-2535 selector; if this changes the bindings no
        // longer match what the on-chain DiamondCutFacet routes.
        let f = IDIAMONDCUT_ABI
            .function("diamondCut")
            .expect("diamondCut is in the ABI");
        assert_eq!(f.short_signature(), [0x1f, 0x93, 0x1c, 0x1c]);
    }

    #[test]
    fn loupe_selectors() {
        let selector = |name: &str| {
            IDIAMONDLOUPE_ABI
                .function(name)
                .expect("function is in the ABI")
                .short_signature()
        };
        assert_eq!(selector("facets"), [0x7a, 0x0e, 0xd6, 0x27]);
        assert_eq!(selector("facetFunctionSelectors"), [0xad, 0xfc, 0xa1, 0x5e]);
        assert_eq!(selector("facetAddresses"), [0x52, 0xef, 0x6b, 0x2c]);
        assert_eq!(selector("facetAddress"), [0xcd, 0xff, 0xac, 0xc6]);
    }

    #[test]
    fn erc165_selector() {
        let f = IERC165_ABI
            .function("supportsInterface")
            .expect("supportsInterface is in the ABI");
        assert_eq!(f.short_signature(), [0x01, 0xff, 0xc9, 0xa7]);
    }
}
