// Purpose: Per-sample execution of compiled graphs
// The VM and the state it runs against: glides, channels and wavetables

pub mod automation;
pub mod channels;
pub mod vm;
pub mod wave;

pub use automation::{AutomatedValue, AutomationError, AutomationMode};
pub use channels::Channels;
pub use vm::{Frame, ProgramState};
pub use wave::{Wave, WaveBank};
