//! Base market template and shared reserve strategies.
//!
//! Derived markets start from [`base`] and override fields key by key; the
//! base itself carries no per-network address books.

use crate::config::{
    ray_bps, ray_pct, BaseCurrency, MarketConfiguration, RateStrategyParams, ReserveParams,
    TokenNamePrefixes,
};
use alloy::primitives::U256;
use std::collections::BTreeMap;

/// Fixed oracle unit for USD-quoted markets (8 decimals).
pub const USD_BASE_CURRENCY_UNIT: u64 = 100_000_000;

/// Rate strategy for stablecoin reserves.
pub fn rate_strategy_stable_one() -> RateStrategyParams {
    RateStrategyParams {
        name: "rateStrategyStableOne".to_string(),
        optimal_usage_ratio: ray_pct(90),
        base_variable_borrow_rate: U256::ZERO,
        variable_rate_slope1: ray_pct(4),
        variable_rate_slope2: ray_pct(60),
        stable_rate_slope1: ray_bps(50),
        stable_rate_slope2: ray_pct(60),
        base_stable_rate_offset: ray_pct(1),
        stable_rate_excess_offset: ray_pct(8),
        optimal_stable_to_total_debt_ratio: ray_pct(20),
    }
}

/// Rate strategy for volatile reserves.
pub fn rate_strategy_volatile_one() -> RateStrategyParams {
    RateStrategyParams {
        name: "rateStrategyVolatileOne".to_string(),
        optimal_usage_ratio: ray_pct(45),
        base_variable_borrow_rate: U256::ZERO,
        variable_rate_slope1: ray_pct(7),
        variable_rate_slope2: ray_pct(300),
        stable_rate_slope1: ray_pct(7),
        stable_rate_slope2: ray_pct(300),
        base_stable_rate_offset: ray_pct(2),
        stable_rate_excess_offset: ray_pct(5),
        optimal_stable_to_total_debt_ratio: ray_pct(20),
    }
}

fn stablecoin_reserve() -> ReserveParams {
    ReserveParams {
        rate_strategy: "rateStrategyStableOne".to_string(),
        base_ltv_bps: 0,
        liquidation_threshold_bps: 0,
        liquidation_bonus_bps: 0,
        liquidation_protocol_fee_bps: 1_000,
        borrowing_enabled: true,
        stable_borrow_rate_enabled: false,
        flash_loan_enabled: false,
        decimals: 18,
        a_token_impl: "AToken".to_string(),
        reserve_factor_bps: 1_000,
        supply_cap: 2_000_000_000,
        borrow_cap: 0,
        debt_ceiling: 0,
        borrowable_in_isolation: false,
    }
}

pub(super) fn strategy_dai() -> ReserveParams {
    stablecoin_reserve()
}

pub(super) fn strategy_usdc() -> ReserveParams {
    stablecoin_reserve()
}

pub(super) fn strategy_weth() -> ReserveParams {
    ReserveParams {
        rate_strategy: "rateStrategyVolatileOne".to_string(),
        base_ltv_bps: 6_500,
        liquidation_threshold_bps: 7_000,
        liquidation_bonus_bps: 11_000,
        liquidation_protocol_fee_bps: 1_000,
        borrowing_enabled: true,
        stable_borrow_rate_enabled: false,
        flash_loan_enabled: true,
        decimals: 18,
        a_token_impl: "AToken".to_string(),
        reserve_factor_bps: 2_000,
        supply_cap: 0,
        borrow_cap: 0,
        debt_ceiling: 0,
        borrowable_in_isolation: false,
    }
}

pub(super) fn strategy_aave() -> ReserveParams {
    ReserveParams {
        rate_strategy: "rateStrategyVolatileOne".to_string(),
        base_ltv_bps: 5_000,
        liquidation_threshold_bps: 6_500,
        liquidation_bonus_bps: 11_000,
        liquidation_protocol_fee_bps: 0,
        borrowing_enabled: false,
        stable_borrow_rate_enabled: false,
        flash_loan_enabled: false,
        decimals: 18,
        a_token_impl: "AToken".to_string(),
        reserve_factor_bps: 0,
        supply_cap: 0,
        borrow_cap: 0,
        debt_ceiling: 0,
        borrowable_in_isolation: false,
    }
}

/// The base Aave market template. No network address books; derived
/// markets supply those.
pub fn base() -> MarketConfiguration {
    MarketConfiguration {
        market_id: "Aave Market".to_string(),
        provider_id: 1,
        testnet_market: true,
        wrapped_native_symbol: "WETH".to_string(),
        prefixes: TokenNamePrefixes {
            a_token_name_prefix: "Aave".to_string(),
            stable_debt_name_prefix: "Aave".to_string(),
            variable_debt_name_prefix: "Aave".to_string(),
            symbol_prefix: "Eth".to_string(),
        },
        base_currency: BaseCurrency {
            symbol: "USD".to_string(),
            unit: U256::from(USD_BASE_CURRENCY_UNIT),
        },
        rate_strategies: BTreeMap::from([
            (
                "rateStrategyStableOne".to_string(),
                rate_strategy_stable_one(),
            ),
            (
                "rateStrategyVolatileOne".to_string(),
                rate_strategy_volatile_one(),
            ),
        ]),
        reserves_config: BTreeMap::from([
            ("DAI".to_string(), strategy_dai()),
            ("USDC".to_string(), strategy_usdc()),
            ("WETH".to_string(), strategy_weth()),
        ]),
        reserve_assets: BTreeMap::new(),
        chainlink_aggregators: BTreeMap::new(),
        emodes: BTreeMap::new(),
        incentives_controller: BTreeMap::new(),
        aggregator_proxy: BTreeMap::new(),
    }
}
