// Utilitaires DSP - Hygiène audio du callback temps-réel

/// Flush denormals to zero (anti-dénormaux)
///
/// Les queues de décroissance exponentielle passent longtemps près de zéro ;
/// les nombres dénormaux y coûtent cher sur certains processeurs.
///
/// Seuil: 1e-15 (largement sous le bruit numérique à 32-bit float)
#[inline]
pub fn flush_denormals_to_zero(x: f32) -> f32 {
    if x.abs() < 1e-15 { 0.0 } else { x }
}

/// Soft clipping avec tanh (saturation douce)
///
/// Plusieurs clics accentués qui se chevauchent dépassent facilement 1.0 ;
/// tanh les ramène dans [-1, 1] sans distorsion dure.
#[inline]
pub fn soft_clip(x: f32) -> f32 {
    x.tanh()
}

/// Durée en millisecondes → nombre de samples (arrondi)
#[inline]
pub fn ms_to_samples(ms: f32, sample_rate: f32) -> u32 {
    (ms * 0.001 * sample_rate).round().max(0.0) as u32
}

/// Traitement d'un sample mixé avant écriture dans le buffer de sortie
#[inline]
pub fn finish_sample(x: f32) -> f32 {
    soft_clip(flush_denormals_to_zero(x))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flush_denormals() {
        assert_eq!(flush_denormals_to_zero(1e-20), 0.0);
        assert_eq!(flush_denormals_to_zero(0.1), 0.1);
        assert_eq!(flush_denormals_to_zero(-0.1), -0.1);
    }

    #[test]
    fn test_soft_clip() {
        assert!((soft_clip(0.0) - 0.0).abs() < 0.001);
        assert!((soft_clip(0.5) - 0.462).abs() < 0.01);

        // Saturation : tanh converge vers ±1.0
        assert!(soft_clip(10.0) <= 1.0);
        assert!(soft_clip(10.0) > 0.99);
        assert!(soft_clip(-10.0) >= -1.0);
        assert!(soft_clip(-10.0) < -0.99);
    }

    #[test]
    fn test_ms_to_samples() {
        assert_eq!(ms_to_samples(100.0, 44100.0), 4410);
        assert_eq!(ms_to_samples(62.5, 48000.0), 3000);
        assert_eq!(ms_to_samples(-5.0, 48000.0), 0);
    }

    #[test]
    fn test_finish_sample() {
        assert_eq!(finish_sample(1e-20), 0.0);
        assert!(finish_sample(3.0) < 1.0);
    }
}
