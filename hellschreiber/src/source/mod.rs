mod sine;

pub use self::sine::{
    SineWave,
    sine,
};

pub trait SignalGenerator {
    type Sample;

    fn next(&mut self) -> Self::Sample;

    fn take_samples(&mut self, num_samples: usize) -> Vec<Self::Sample> {
        (0..num_samples).map(|_| self.next()).collect()
    }
}
