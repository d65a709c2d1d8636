/// Raw on-chain reputation to the familiar log-scale score.
///
/// `sign(raw) * max(log10(|raw|) - 9, 0) * 9 + 25`, so a fresh account sits
/// at 25. Zero has no logarithm and maps straight to 25.
pub fn to_rep(raw: i64) -> f64 {
    if raw == 0 {
        return 25.0;
    }

    let level = ((raw.unsigned_abs() as f64).log10() - 9.0).max(0.0);
    let signed = if raw < 0 { -level } else { level };

    signed * 9.0 + 25.0
}
