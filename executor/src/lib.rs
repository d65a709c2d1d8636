pub mod remote_signer;  // Signing service over HTTP
pub mod dry_run;        // Simulation mode


pub use dry_run::DryRunBroadcaster;
pub use remote_signer::RemoteSigner;
