//! Utilities.
use anyhow::{anyhow, ensure, Result};
use candle_core::{backprop::GradStore, Device, Tensor, Var};
use candle_nn::{rnn::LSTMState, VarMap};
use lis_core::{error::LisError, RecurrentState};

/// Returns the variables of a [`VarMap`] with their names, sorted by name.
///
/// Models built from the same configuration have the same names, so the returned
/// vectors of two such models can be zipped.
pub fn named_vars(varmap: &VarMap) -> Result<Vec<(String, Var)>> {
    let data = varmap
        .data()
        .lock()
        .map_err(|_| anyhow!("var map lock is poisoned"))?;
    let mut vars: Vec<(String, Var)> = data.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
    vars.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(vars)
}

/// Copies the values of `src` into `dest`, variable by variable.
///
/// Both slices must list the same names in the same order.
pub fn copy_vars(dest: &[(String, Var)], src: &[(String, Var)]) -> Result<()> {
    ensure!(
        dest.len() == src.len(),
        "number of variables differs: {} != {}",
        dest.len(),
        src.len()
    );
    for ((k_dest, v_dest), (k_src, v_src)) in dest.iter().zip(src.iter()) {
        ensure!(k_dest == k_src, "variable names differ: {} != {}", k_dest, k_src);
        v_dest.set(v_src.as_tensor())?;
    }
    Ok(())
}

/// Clips gradients of `vars` in place so that their global L2 norm is at most `max_norm`.
///
/// Returns the global norm before clipping. Fails with
/// [`LisError::NumericInstability`] if the norm is not finite, leaving `grads` unscaled.
pub fn clip_grad_norm(grads: &mut GradStore, vars: &[Var], max_norm: f64) -> Result<f32> {
    let mut sq_sum = 0f32;
    for var in vars.iter() {
        if let Some(g) = grads.get(var.as_tensor()) {
            sq_sum += g.sqr()?.sum_all()?.to_scalar::<f32>()?;
        }
    }
    let norm = sq_sum.sqrt();
    if !norm.is_finite() {
        return Err(LisError::NumericInstability(format!("gradient norm is {}", norm)))?;
    }

    if norm as f64 > max_norm {
        let scale = max_norm / norm as f64;
        for var in vars.iter() {
            if let Some(g) = grads.remove(var.as_tensor()) {
                let _ = grads.insert(var.as_tensor(), g.affine(scale, 0.)?);
            }
        }
    }

    Ok(norm)
}

/// Converts a [`RecurrentState`] into an LSTM state with batch size 1.
pub fn to_lstm_state(state: &RecurrentState, device: &Device) -> Result<LSTMState> {
    let h = Tensor::from_slice(state.h(), (1, state.dim()), device)?;
    let c = Tensor::from_slice(state.c(), (1, state.dim()), device)?;
    Ok(LSTMState::new(h, c))
}

/// Converts an LSTM state with batch size 1 into a [`RecurrentState`].
pub fn from_lstm_state(state: &LSTMState) -> Result<RecurrentState> {
    let h = state.h().squeeze(0)?.to_vec1::<f32>()?;
    let c = state.c().squeeze(0)?.to_vec1::<f32>()?;
    Ok(RecurrentState::new(h, c))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clip_grad_norm() -> Result<()> {
        let v = Var::new(&[3f32, 4.], &Device::Cpu)?;
        let loss = v.as_tensor().sqr()?.sum_all()?.affine(0.5, 0.)?;
        let mut grads = loss.backward()?;

        let norm = clip_grad_norm(&mut grads, &[v.clone()], 1.0)?;
        assert!((norm - 5.0).abs() < 1e-5);

        let g = grads.get(v.as_tensor()).unwrap().to_vec1::<f32>()?;
        assert!((g[0] - 0.6).abs() < 1e-5);
        assert!((g[1] - 0.8).abs() < 1e-5);
        Ok(())
    }

    #[test]
    fn test_clip_grad_norm_below_threshold() -> Result<()> {
        let v = Var::new(&[0.3f32, 0.4], &Device::Cpu)?;
        let loss = v.as_tensor().sqr()?.sum_all()?.affine(0.5, 0.)?;
        let mut grads = loss.backward()?;

        let norm = clip_grad_norm(&mut grads, &[v.clone()], 40.0)?;
        assert!((norm - 0.5).abs() < 1e-5);
        let g = grads.get(v.as_tensor()).unwrap().to_vec1::<f32>()?;
        assert!((g[0] - 0.3).abs() < 1e-6);
        Ok(())
    }

    #[test]
    fn test_clip_grad_norm_rejects_nan() -> Result<()> {
        let v = Var::new(&[1f32, 1.], &Device::Cpu)?;
        let loss = v.as_tensor().affine(f64::NAN, 0.)?.sum_all()?;
        let mut grads = loss.backward()?;

        let err = clip_grad_norm(&mut grads, &[v], 40.0).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<LisError>(),
            Some(LisError::NumericInstability(_))
        ));
        Ok(())
    }

    #[test]
    fn test_lstm_state_conversion() -> Result<()> {
        let state = RecurrentState::new(vec![0.5, -1.0, 2.0], vec![1.0, 0.0, -3.0]);
        let lstm_state = to_lstm_state(&state, &Device::Cpu)?;
        assert_eq!(lstm_state.h().dims(), &[1, 3]);
        assert_eq!(from_lstm_state(&lstm_state)?, state);
        Ok(())
    }

    #[test]
    fn test_copy_vars_checks_names() -> Result<()> {
        let a = vec![("w".to_string(), Var::new(&[1f32, 2.], &Device::Cpu)?)];
        let b = vec![("w".to_string(), Var::new(&[5f32, 6.], &Device::Cpu)?)];
        let c = vec![("v".to_string(), Var::new(&[5f32, 6.], &Device::Cpu)?)];

        copy_vars(&a, &b)?;
        assert_eq!(a[0].1.as_tensor().to_vec1::<f32>()?, vec![5.0, 6.0]);
        assert!(copy_vars(&a, &c).is_err());
        Ok(())
    }
}
