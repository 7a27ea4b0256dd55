use hdlcmux_frame::{DEFAULT_REASSEMBLY_CAPACITY, DEFAULT_RING_CAPACITY, MAX_PAYLOAD};

use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};

pub fn run(args: VersionArgs) -> CliResult<i32> {
    if !args.extended {
        println!("hdlcmux {}", env!("CARGO_PKG_VERSION"));
        return Ok(SUCCESS);
    }

    println!("name: hdlcmux");
    println!("version: {}", env!("CARGO_PKG_VERSION"));
    println!(
        "target: {}",
        option_env!("HDLCMUX_BUILD_TARGET").unwrap_or("unknown")
    );
    println!(
        "profile: {}",
        option_env!("HDLCMUX_BUILD_PROFILE").unwrap_or("unknown")
    );
    println!(
        "features: link={}, serial={}, async={}, cli=true",
        cfg!(feature = "link"),
        cfg!(feature = "serial"),
        cfg!(feature = "async")
    );
    println!(
        "limits: max_payload={MAX_PAYLOAD}, reassembly={DEFAULT_REASSEMBLY_CAPACITY}, tx_ring={DEFAULT_RING_CAPACITY}"
    );

    Ok(SUCCESS)
}
