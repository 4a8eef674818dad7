use uf2fs::{
    config::Config,
    consts::BLOCK_SIZE,
    driver::{BlockDevice, Flash},
    ram_flash,
    registry::{Registry, CURRENT_FILE_ID},
    uf2::Uf2Block,
    volume::Volume,
};

use zerocopy::IntoBytes;

ram_flash!(
    name = RamFlash,
    backend = Ram,
    erase_value = 0xff,
    base = 0x1000_0000,
    size = 16 * 1024,
);

const FAMILY: u32 = 0xADA5_2840;

fn config() -> Config {
    Config::default()
        .with_volume_label(Some("TESTBOOT"))
        .with_flash(0x1000_0000, 16 * 1024)
}

fn pattern() -> [u8; 4096] {
    core::array::from_fn(|i| (i * 7 + i / 256) as u8)
}

/// Read the live image file off `volume`, one frame per block.
fn read_current<F: Flash>(volume: &mut Volume<F, 4>, buf: &mut [u8]) -> u32 {
    let registry = volume.registry();
    let file_id = registry.find(CURRENT_FILE_ID).unwrap();
    let info = volume.file_info(file_id).unwrap();
    let lba = volume.registry().layout().cluster_block(info.start_cluster);
    let len = info.size as usize;
    volume.read_blocks(lba, &mut buf[..len]).unwrap();
    info.size
}

#[test]
fn current_image_round_trips() {
    let data = pattern();
    let mut source = Ram::default();
    let mut source_volume = Volume::new(
        Registry::<4>::with_default_files(config()).unwrap(),
        RamFlash::new(&mut source),
    );
    source_volume.flash().write(0x1000_0000, &data).unwrap();

    let mut image = [0u8; 16 * BLOCK_SIZE];
    let size = read_current(&mut source_volume, &mut image);
    assert_eq!(size, 16 * BLOCK_SIZE as u32);

    let mut target = Ram::default();
    {
        let mut volume = Volume::new(
            Registry::<4>::with_default_files(config()).unwrap(),
            RamFlash::new(&mut target),
        );
        // hosts put the copy wherever they like; any block will do
        let lba = volume.capacity() - 20;
        volume.write_blocks(lba, &image[..size as usize]).unwrap();
        assert!(volume.progress().is_complete());
        assert_eq!(volume.image_len(), 4096);
    }
    assert_eq!(&target.buf[..4096], &data[..]);
    assert!(target.buf[4096..].iter().all(|&b| b == 0xff));
}

#[test]
fn writing_twice_is_idempotent() {
    let data = pattern();
    let frames: [[u8; BLOCK_SIZE]; 16] = core::array::from_fn(|i| {
        let chunk = &data[i * 256..(i + 1) * 256];
        let mut block = [0u8; BLOCK_SIZE];
        block.copy_from_slice(Uf2Block::new(0x1000_0000 + i as u32 * 256, chunk, i as u32, 16, None).as_bytes());
        block
    });

    let mut once = Ram::default();
    let mut twice = Ram::default();
    for (backend, passes) in [(&mut once, 1), (&mut twice, 2)] {
        let mut volume = Volume::new(
            Registry::<4>::with_default_files(config()).unwrap(),
            RamFlash::new(backend),
        );
        for _ in 0..passes {
            // reverse order, frames carry their own address
            for (i, block) in frames.iter().enumerate().rev() {
                volume.write_blocks(100 + i as u32, block).unwrap();
            }
        }
    }
    assert_eq!(once.buf, twice.buf);
    assert_eq!(once.image_len, twice.image_len);
    assert_eq!(&once.buf[..4096], &data[..]);
}

#[test]
fn family_id_filters_frames() {
    let mut backend = Ram::default();
    {
        let mut volume = Volume::new(
            Registry::<4>::with_default_files(config().with_family_id(Some(FAMILY))).unwrap(),
            RamFlash::new(&mut backend),
        );
        let ours = Uf2Block::new(0x1000_0000, &[0x01; 256], 0, 3, Some(FAMILY));
        let theirs = Uf2Block::new(0x1000_0100, &[0x02; 256], 1, 3, Some(0x1234_5678));
        let untagged = Uf2Block::new(0x1000_0200, &[0x03; 256], 2, 3, None);
        for block in [ours.as_bytes(), theirs.as_bytes(), untagged.as_bytes()] {
            volume.write_blocks(50, block).unwrap();
        }
    }
    assert!(backend.buf[..256].iter().all(|&b| b == 0x01));
    assert!(backend.buf[256..512].iter().all(|&b| b == 0xff));
    assert!(backend.buf[512..768].iter().all(|&b| b == 0x03));
    assert_eq!(backend.writes, 2);
}

#[test]
fn out_of_window_frames_are_dropped() {
    let mut backend = Ram::default();
    let pristine = backend.buf;
    {
        let mut volume = Volume::new(
            Registry::<4>::with_default_files(config()).unwrap(),
            RamFlash::new(&mut backend),
        );
        let below = Uf2Block::new(0x0FFF_FF00, &[0x55; 256], 0, 2, None);
        let above = Uf2Block::new(0x1000_4000, &[0x55; 256], 1, 2, None);
        volume.write_blocks(60, below.as_bytes()).unwrap();
        volume.write_blocks(61, above.as_bytes()).unwrap();
        assert_eq!(volume.progress().received(), 0);
    }
    assert_eq!(backend.buf, pristine);
    assert_eq!(backend.writes, 0);
}

#[test]
fn default_files_are_listed() {
    let mut backend = Ram::default();
    let mut volume = Volume::new(
        Registry::<4>::with_default_files(config()).unwrap(),
        RamFlash::new(&mut backend),
    );
    assert_eq!(volume.volume_label(), Some(*b"TESTBOOT   "));
    assert_eq!(volume.flash_window_size(), 16 * 1024);

    let dir_start = volume.registry().layout().dir_start;
    let mut block = [0u8; BLOCK_SIZE];
    volume.read_blocks(dir_start, &mut block).unwrap();

    let names: [&[u8]; 4] = [b"TESTBOOT   ", b"INFO_UF2TXT", b"INDEX   HTM", b"CURRENT UF2"];
    for (slot, name) in names.iter().enumerate() {
        assert_eq!(&block[slot * 32..slot * 32 + 11], *name);
    }
    assert_eq!(block[11], 0x08);
    assert!(block[4 * 32..].iter().all(|&b| b == 0));

    // empty flash: the live image is listed with no data
    let current = &block[3 * 32..4 * 32];
    assert_eq!(&current[26..28], &[0, 0]);
    assert_eq!(&current[28..32], &[0, 0, 0, 0]);
}
