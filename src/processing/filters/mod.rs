pub mod lowpass;

pub trait FilterInstance: Send {
    fn filter_sample(&mut self, sample: f64) -> f64;
}
