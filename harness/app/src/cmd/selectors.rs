// Copyright 2022-2024 Protocol Labs
// SPDX-License-Identifier: Apache-2.0, MIT

use crate::cmd;
use crate::options::selectors::SelectorsArgs;

use trex_harness_artifacts::ArtifactStore;

cmd! {
  SelectorsArgs(self, settings) {
    let artifacts = ArtifactStore::load(&settings.artifacts_file)?;
    let artifact = artifacts.get(&self.contract)?;

    for function in artifact.functions() {
        println!(
            "0x{} {}",
            hex::encode(function.short_signature()),
            function.signature()
        );
    }

    Ok(())
  }
}
