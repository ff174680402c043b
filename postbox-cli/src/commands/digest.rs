//! `postbox digest <text>`

use anyhow::Result;
use clap::Args;

use postbox_session::digest_hex;

#[derive(Args, Debug)]
pub struct DigestArgs {
    /// Text to hash, e.g. the admin username or password.
    pub text: String,
}

impl DigestArgs {
    pub fn run(self) -> Result<()> {
        println!("{}", digest_hex(&self.text));
        Ok(())
    }
}
