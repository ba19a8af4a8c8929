// demos/pricing_demo.rs

//! Demonstration of closed-form pricing, implied-vol inversion and volatility nodes
//!
//! This example shows how to:
//! 1. Price a European option under Black, Black-Scholes and Bachelier
//! 2. Recover implied volatilities from those prices
//! 3. Build a 5-point delta smile and read vols by strike and by delta
//! 4. Layer Samuelson decay and an FX composite on top
//!
//! Run with `RUST_LOG=debug` to see the smile fits and solver fallbacks.

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;
use volnode_lib::{
    bachelier_implied_vol, bachelier_price, black_implied_vol, black_price, bs_implied_vol,
    bs_price, Accrual, Delta5Vol, FxCompositeVol, FxVolCurve, NodeBase, OptionType,
    SamuelsonDelta5Vol, SmileQuotes, VolModel, VolNode, DELTA_PILLARS,
};

/// 2024-01-02 as a spreadsheet serial date
const TODAY: f64 = 45293.0;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("Closed-Form Pricing and Volatility Node Demo");
    println!("============================================");

    println!("\nStep 1: Pricing a one-year option (F = K = 100, 20% vol, r = 3%)...");
    let (f, k, vol, t, r): (f64, f64, f64, f64, f64) = (100.0, 100.0, 0.20, 1.0, 0.03);
    let df = (-r * t).exp();
    let black = black_price(f, k, vol, t, df, OptionType::Call)?;
    let bs = bs_price(f, k, vol, t, r, 0.0, OptionType::Call)?;
    let normal = bachelier_price(f, k, vol * f, t, df, OptionType::Call)?;
    println!("  Black call:      {:.6}", black);
    println!("  BS call:         {:.6}", bs);
    println!("  Bachelier call:  {:.6}", normal);

    println!("\nStep 2: Inverting the prices...");
    println!("  Black IV:        {:.8}", black_implied_vol(black, f, k, r, t, OptionType::Call)?);
    println!("  BS IV:           {:.8}", bs_implied_vol(bs, f, k, r, t, OptionType::Call)?);
    println!(
        "  Bachelier IV:    {:.8}",
        bachelier_implied_vol(normal, f, k, r, t, OptionType::Call)?
    );

    println!("\nStep 3: Building a 6-month delta smile...");
    let base = NodeBase::new(0.21, TODAY, TODAY + 182.0, Accrual::Act365)?;
    let quotes = SmileQuotes {
        fwd: 100.0,
        d10_vol: 0.275,
        d25_vol: 0.235,
        d75_vol: 0.198,
        d90_vol: 0.205,
    };
    let smile = Delta5Vol::new(base.clone(), quotes).context("smile quotes rejected")?;
    println!("  omega (dσ/d ln K at 50-delta): {:.6}", smile.omega()?);
    println!("\n  {:>8} {:>10} {:>8}", "Delta", "Strike", "Vol");
    println!("  {}", "-".repeat(28));
    for (&delta, strike) in DELTA_PILLARS.iter().zip(smile.pillar_strikes()?) {
        println!(
            "  {:>8.2} {:>10.4} {:>8.4}",
            delta,
            strike,
            smile.vol_by_delta(delta, None)?
        );
    }

    println!("\n  {:>8} {:>8} {:>10}", "Strike", "Vol", "Put");
    println!("  {}", "-".repeat(28));
    let t_node = smile.base().time_to_expiry();
    for strike in [80.0, 90.0, 100.0, 110.0, 120.0] {
        let v = smile.vol_by_strike(strike, None)?;
        let put = black_price(100.0, strike, v, t_node, 1.0, OptionType::Put)?;
        println!("  {:>8.1} {:>8.4} {:>10.4}", strike, v, put);
    }

    println!("\nStep 4: Samuelson decay and FX composite...");
    let samuelson: VolNode = SamuelsonDelta5Vol::new(base, quotes, 0.8, 3.0)?.into();
    let fx = FxVolCurve::new(
        TODAY,
        vec![TODAY + 91.0, TODAY + 182.0, TODAY + 365.0],
        vec![0.095, 0.09, 0.085],
        Accrual::Act365,
    )?;
    let mut composite: VolNode = FxCompositeVol::new(samuelson.clone(), fx, -0.35)?.into();

    for days in [30.0, 91.0, 182.0] {
        let dmat = Some(TODAY + days);
        println!(
            "  {:>3} days: Samuelson 25d vol {:.4}, FX composite 25d vol {:.4}",
            days,
            samuelson.vol_by_delta(0.25, dmat)?,
            composite.vol_by_delta(0.25, dmat)?
        );
    }

    composite.set_fx_atm_vol(0.12, 1)?;
    println!(
        "  after re-marking the 6m FX vol: composite 25d vol {:.4}",
        composite.vol_by_delta(0.25, None)?
    );

    println!("\nDemo completed successfully!");
    Ok(())
}
