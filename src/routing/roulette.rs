//! 轮盘赌选择（按权重的随机选择）

use rand::Rng;

/// 累积权重与抽样值 `r` 比较的方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Threshold {
    /// 第一个累积值 `>= r` 的候选胜出（逐跳概率路由）
    Inclusive,
    /// 第一个累积值 `> r` 的候选胜出（多路径分流）
    Exclusive,
}

/// 在 `[0, sum(weights))` 上均匀抽样，按候选顺序累加，返回胜出候选的下标。
///
/// 权重和不为正时不抽样，直接返回 `None`；浮点误差导致没有候选胜出时也返回 `None`，
/// 由调用方决定回退策略。
pub fn spin<R: Rng + ?Sized>(weights: &[f64], threshold: Threshold, rng: &mut R) -> Option<usize> {
    let total: f64 = weights.iter().sum();
    if !(total > 0.0) || !total.is_finite() {
        return None;
    }
    let r = rng.gen_range(0.0..total);
    let mut acc = 0.0;
    for (i, &w) in weights.iter().enumerate() {
        acc += w;
        let hit = match threshold {
            Threshold::Inclusive => acc >= r,
            Threshold::Exclusive => acc > r,
        };
        if hit {
            return Some(i);
        }
    }
    None
}
