#![cfg_attr(not(test), no_std)]

/*!
A FAT12 volume with no storage behind it, for flashing firmware over USB
mass storage.

Plug a device in and the host sees a small drive: an info text file, a
redirect page, and `CURRENT.UF2`, the firmware currently in flash encoded as
[UF2](https://github.com/microsoft/uf2). Copy a `.uf2` file onto the drive and
every frame of it that targets the device's flash window gets programmed.

Every block of the volume is computed when the host reads it: the boot
sector from the [`Config`](config::Config), the allocation table and root
directory from the [`Registry`](registry::Registry), file data from static
bytes or, for the live image, from flash through the [`Codec`](uf2::Codec).
Nothing is cached, so the live image always reflects what is in flash.

## Usage

Implement [`Flash`](driver::Flash) for your program memory, populate a
registry at boot, and hand both to a [`Volume`](volume::Volume), which
implements the [`BlockDevice`](driver::BlockDevice) interface your USB
mass storage class calls into.

```
use uf2fs::{config::Config, driver::BlockDevice, registry::Registry, volume::Volume};

uf2fs::ram_flash!(name = RamFlash, backend = Ram, erase_value = 0xff, base = 0, size = 64 * 1024,);

let config = Config::default().with_flash(0, 64 * 1024);
let registry = Registry::<4>::with_default_files(config).unwrap();

let mut backend = Ram::default();
let mut volume = Volume::new(registry, RamFlash::new(&mut backend));

let mut block = [0u8; 512];
volume.read_blocks(0, &mut block).unwrap();
assert_eq!(&block[510..], &[0x55, 0xAA]);
```

Writes never fail on bad data: frames with the wrong magic, an oversized
payload, a foreign family id or a target outside the flash window are
dropped, logged, and the transfer carries on.

## Features

* `log` (default): emit diagnostics through the `log` facade.
* `defmt`: emit diagnostics through `defmt`.
* `serde` (default): derive `Serialize`/`Deserialize` for configuration and
  file metadata.
*/

#[macro_use]
mod fmt;

#[macro_use]
pub mod macros;

pub mod boot;
pub mod config;
pub mod consts;
pub mod dir;
pub mod dmesg;
pub mod driver;
pub mod io;
pub mod name;
pub mod progress;
pub mod registry;
pub mod table;
pub mod uf2;
pub mod volume;

pub use io::{Error, Result};
