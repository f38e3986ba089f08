//! "Build on Bitcoin" market: the base template with market-specific
//! overrides applied key by key.

use super::base::{base, strategy_aave, strategy_dai, strategy_usdc, strategy_weth};
use crate::config::{EModeCategory, MarketConfiguration, TokenNamePrefixes};
use crate::network::Network;
use alloy::primitives::{address, Address};
use std::collections::BTreeMap;

/// The BOB market template.
pub fn bob() -> MarketConfiguration {
    let mut config = base();

    config.market_id = "Build on Bitcoin".to_string();
    config.provider_id = 111;
    config.testnet_market = false;
    config.prefixes = TokenNamePrefixes {
        a_token_name_prefix: "Bob".to_string(),
        stable_debt_name_prefix: "Bob".to_string(),
        variable_debt_name_prefix: "Bob".to_string(),
        symbol_prefix: "Bob".to_string(),
    };

    config
        .reserves_config
        .insert("AAVE".to_string(), strategy_aave());
    // Re-assert the inherited reserves so the override list is explicit.
    config.reserves_config.insert("DAI".to_string(), strategy_dai());
    config
        .reserves_config
        .insert("USDC".to_string(), strategy_usdc());
    config
        .reserves_config
        .insert("WETH".to_string(), strategy_weth());

    config.reserve_assets = BTreeMap::from([
        (
            Network::Testnet,
            BTreeMap::from([
                (
                    "USDC".to_string(),
                    address!("14E986C4a733B555c317D95Fe0FC5bFB5a7D166C"),
                ),
                (
                    "DAI".to_string(),
                    address!("cb913C75362A7Fd39de6A5DDE4341F370F5B4419"),
                ),
                (
                    "WETH".to_string(),
                    address!("327E7E4A9e054ecC67dFa9E3Af158347116321Bf"),
                ),
                (
                    "AAVE".to_string(),
                    address!("F1b760dcB43A93694333A0E0ABc20F4D3e611985"),
                ),
            ]),
        ),
        (Network::Local, local_reserve_assets()),
        // Main assets pending listing; resolution stays permissive and the
        // gap is reported by validate_for_network.
    ]);

    config.chainlink_aggregators = BTreeMap::from([
        (
            Network::Testnet,
            BTreeMap::from([
                (
                    "DAI".to_string(),
                    address!("b062542b2A173fe90E885C1A2bF6C87F842167d0"),
                ),
                (
                    "USDC".to_string(),
                    address!("b062542b2A173fe90E885C1A2bF6C87F842167d0"),
                ),
                (
                    "AAVE".to_string(),
                    address!("61f72e0419c2D3073bA4A78CB3f2075625Ff6f5B"),
                ),
                (
                    "WETH".to_string(),
                    address!("5281b36049dDdcb2161dACab4ec5e80b638459c6"),
                ),
            ]),
        ),
        (Network::Local, local_aggregators()),
    ]);

    config.emodes = BTreeMap::from([(
        "StableEMode".to_string(),
        EModeCategory {
            id: 1,
            ltv_bps: 9_700,
            liquidation_threshold_bps: 9_750,
            liquidation_bonus_bps: 10_100,
            label: "Stablecoins".to_string(),
            assets: vec!["USDC".to_string(), "DAI".to_string()],
        },
    )]);

    // Testnet reuses an externally operated rewards controller; other
    // networks get a stand-in deployed during the pipeline run.
    config.incentives_controller = BTreeMap::from([(
        Network::Testnet,
        address!("3C90887dbdC126907dD6c347409eB6564ee28d24"),
    )]);

    // ETH/USD proxy feeding the UI data providers. Only Testnet has one;
    // elsewhere the pipeline deploys a stand-in.
    config.aggregator_proxy = BTreeMap::from([(
        Network::Testnet,
        address!("5281b36049dDdcb2161dACab4ec5e80b638459c6"),
    )]);

    config
}

fn local_reserve_assets() -> BTreeMap<String, Address> {
    BTreeMap::from([
        (
            "DAI".to_string(),
            address!("1111111111111111111111111111111111111111"),
        ),
        (
            "USDC".to_string(),
            address!("2222222222222222222222222222222222222222"),
        ),
        (
            "WETH".to_string(),
            address!("3333333333333333333333333333333333333333"),
        ),
        (
            "AAVE".to_string(),
            address!("4444444444444444444444444444444444444444"),
        ),
    ])
}

fn local_aggregators() -> BTreeMap<String, Address> {
    BTreeMap::from([
        (
            "DAI".to_string(),
            address!("a111111111111111111111111111111111111111"),
        ),
        (
            "USDC".to_string(),
            address!("a222222222222222222222222222222222222222"),
        ),
        (
            "WETH".to_string(),
            address!("a333333333333333333333333333333333333333"),
        ),
        (
            "AAVE".to_string(),
            address!("a444444444444444444444444444444444444444"),
        ),
    ])
}
