use std::collections::VecDeque;

use ndarray::{Array, Dimension, Zip};

const ARMIJO_C: f32 = 1e-4;
const GRAD_EPS: f32 = 1e-12;
const CURVATURE_EPS: f32 = 1e-10;
const MAX_BACKTRACKS: usize = 20;

/// Limited-memory BFGS with a backtracking (Armijo) line search.
///
/// One `step` call performs a single quasi-Newton iteration; the evaluation
/// closure may run several times while the line search probes the descent
/// direction. The closure receives the candidate point mutably and may
/// adjust it in place before evaluating; the style-transfer loop uses this
/// to keep pixel values inside `[0, 1]`.
///
/// Generic over the array dimension so callers never have to flatten their
/// variable.
pub struct Lbfgs<D: Dimension> {
    history: usize,
    pairs: VecDeque<Pair<D>>,
}

struct Pair<D: Dimension> {
    s: Array<f32, D>,
    y: Array<f32, D>,
    rho: f32,
}

impl<D: Dimension> Lbfgs<D> {
    /// `history` bounds how many curvature pairs are kept.
    pub fn new(history: usize) -> Self {
        Self {
            history,
            pairs: VecDeque::new(),
        }
    }

    /// Takes one quasi-Newton step from `x`, mutating it in place, and
    /// returns the objective value at the accepted point.
    ///
    /// A vanishing gradient makes the step a no-op, as does a line search
    /// that finds no decrease along the chosen direction.
    pub fn step<F>(&mut self, x: &mut Array<f32, D>, eval: &mut F) -> f32
    where
        F: FnMut(&mut Array<f32, D>) -> (f32, Array<f32, D>),
    {
        let (f0, g) = eval(x);
        let g_norm_sq = dot(&g, &g);
        if !g_norm_sq.is_finite() || g_norm_sq <= GRAD_EPS {
            return f0;
        }

        let mut dir = self.direction(&g);
        let mut dg = dot(&dir, &g);
        if dg >= 0.0 {
            // The curvature history went stale; restart from steepest descent.
            self.pairs.clear();
            dir = g.mapv(|v| -v);
            dg = -g_norm_sq;
        }

        let mut t = if self.pairs.is_empty() {
            (1.0 / g.mapv(f32::abs).sum()).min(1.0)
        } else {
            1.0
        };

        let mut accepted = None;
        for _ in 0..MAX_BACKTRACKS {
            let mut x_t = x.clone();
            Zip::from(&mut x_t).and(&dir).for_each(|xv, &dv| *xv += t * dv);
            let (f_t, g_t) = eval(&mut x_t);
            if f_t <= f0 + ARMIJO_C * t * dg {
                accepted = Some((x_t, f_t, g_t));
                break;
            }
            t *= 0.5;
        }
        let Some((x_new, f_new, g_new)) = accepted else {
            return f0;
        };

        let s = &x_new - &*x;
        let y = &g_new - &g;
        let sy = dot(&s, &y);
        if sy > CURVATURE_EPS && self.history > 0 {
            if self.pairs.len() == self.history {
                self.pairs.pop_front();
            }
            self.pairs.push_back(Pair { rho: 1.0 / sy, s, y });
        }

        *x = x_new;
        f_new
    }

    /// Two-loop recursion: approximates `−H⁻¹·g` from the stored pairs.
    fn direction(&self, g: &Array<f32, D>) -> Array<f32, D> {
        let mut q = g.clone();
        let mut alphas = Vec::with_capacity(self.pairs.len());
        for pair in self.pairs.iter().rev() {
            let alpha = pair.rho * dot(&pair.s, &q);
            q.scaled_add(-alpha, &pair.y);
            alphas.push(alpha);
        }
        if let Some(last) = self.pairs.back() {
            let gamma = dot(&last.s, &last.y) / dot(&last.y, &last.y);
            q.mapv_inplace(|v| v * gamma);
        }
        for (pair, alpha) in self.pairs.iter().zip(alphas.into_iter().rev()) {
            let beta = pair.rho * dot(&pair.y, &q);
            q.scaled_add(alpha - beta, &pair.s);
        }
        q.mapv_inplace(|v| -v);
        q
    }
}

fn dot<D: Dimension>(a: &Array<f32, D>, b: &Array<f32, D>) -> f32 {
    Zip::from(a).and(b).fold(0.0, |acc, &x, &y| acc + x * y)
}
