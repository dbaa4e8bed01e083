use embedded_sdmmc::{
    BlockDevice, Error, Mode, RawDirectory, RawFile, RawVolume, TimeSource, VolumeIdx,
    VolumeManager,
};
use log::debug;

use super::{OpenMode, StorageMedium};

/// SD card medium on top of `embedded-sdmmc`.
///
/// The first FAT volume and its root directory stay open while mounted; files
/// are opened and closed per operation so a pulled card never leaves a
/// dangling file handle behind.
///
/// `reclock` is called before every mount attempt with the requested bus
/// clock. The board uses it to reconfigure the SPI bus and force the card
/// through its init sequence again, which is what makes re-insertion work.
///
/// These operations are blocking, as is everything on the scheduler thread.
pub struct SdmmcMedium<D, T, F>
where
    D: BlockDevice,
    T: TimeSource,
    F: FnMut(u32),
{
    volume_mgr: VolumeManager<D, T, 4, 4, 1>,
    reclock: F,
    root: Option<(RawVolume, RawDirectory)>,
}

impl<D, T, F> SdmmcMedium<D, T, F>
where
    D: BlockDevice,
    T: TimeSource,
    F: FnMut(u32),
{
    /// Wrap a block device (usually an `embedded_sdmmc::SdCard`).
    pub fn new(block_device: D, time_source: T, reclock: F) -> Self {
        Self {
            volume_mgr: VolumeManager::new(block_device, time_source),
            reclock,
            root: None,
        }
    }

    fn root_dir(&self) -> Result<RawDirectory, Error<D::Error>> {
        self.root.map(|(_, dir)| dir).ok_or(Error::NoSuchVolume)
    }
}

impl<D, T, F> StorageMedium for SdmmcMedium<D, T, F>
where
    D: BlockDevice,
    T: TimeSource,
    F: FnMut(u32),
{
    type Handle = RawFile;
    type Error = Error<D::Error>;

    fn mount(&mut self, speed_hz: u32) -> Result<(), Self::Error> {
        if self.root.is_some() {
            return Ok(());
        }

        (self.reclock)(speed_hz);

        let volume = self.volume_mgr.open_raw_volume(VolumeIdx(0))?;
        match self.volume_mgr.open_root_dir(volume) {
            Ok(dir) => {
                self.root = Some((volume, dir));
                Ok(())
            }
            Err(e) => {
                if let Err(close_err) = self.volume_mgr.close_volume(volume) {
                    debug!("Volume close after failed mount: {:?}", close_err);
                }
                Err(e)
            }
        }
    }

    fn unmount(&mut self) {
        let Some((volume, dir)) = self.root.take() else {
            return;
        };

        // The card may already be gone; release the bookkeeping regardless.
        if let Err(e) = self.volume_mgr.close_dir(dir) {
            debug!("Root dir close on unmount: {:?}", e);
        }
        if let Err(e) = self.volume_mgr.close_volume(volume) {
            debug!("Volume close on unmount: {:?}", e);
        }
    }

    fn open(&mut self, path: &str, mode: OpenMode) -> Result<RawFile, Self::Error> {
        let dir = self.root_dir()?;
        let mode = match mode {
            OpenMode::Read => Mode::ReadOnly,
            OpenMode::Append => Mode::ReadWriteCreateOrAppend,
        };
        self.volume_mgr.open_file_in_dir(dir, path, mode)
    }

    fn file_len(&mut self, file: RawFile) -> Result<u32, Self::Error> {
        self.volume_mgr.file_length(file)
    }

    fn write(&mut self, file: RawFile, bytes: &[u8]) -> Result<(), Self::Error> {
        self.volume_mgr.write(file, bytes)
    }

    fn close(&mut self, file: RawFile) -> Result<(), Self::Error> {
        self.volume_mgr.close_file(file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FileTimestamps;
    use crate::testing::MockWallClock;
    use core::cell::Cell;
    use embedded_sdmmc::{Block, BlockCount, BlockIdx};

    /// A slot with no card in it: every transfer fails.
    struct EmptySlot;

    #[derive(Debug)]
    struct NoCard;

    impl BlockDevice for EmptySlot {
        type Error = NoCard;

        fn read(&self, _blocks: &mut [Block], _start: BlockIdx) -> Result<(), NoCard> {
            Err(NoCard)
        }

        fn write(&self, _blocks: &[Block], _start: BlockIdx) -> Result<(), NoCard> {
            Err(NoCard)
        }

        fn num_blocks(&self) -> Result<BlockCount, NoCard> {
            Err(NoCard)
        }
    }

    #[test]
    fn test_mount_reclocks_and_reports_missing_card() {
        let speed = Cell::new(None);
        let mut medium = SdmmcMedium::new(
            EmptySlot,
            FileTimestamps(MockWallClock::unset()),
            |hz| speed.set(Some(hz)),
        );

        let result = medium.mount(1_000_000);

        assert!(matches!(result, Err(Error::DeviceError(NoCard))));
        assert_eq!(speed.get(), Some(1_000_000));
    }

    #[test]
    fn test_unmounted_medium_refuses_files() {
        let mut medium = SdmmcMedium::new(EmptySlot, FileTimestamps(MockWallClock::unset()), |_| {});

        medium.unmount();

        assert!(matches!(
            medium.open("WEATHER.CSV", OpenMode::Append),
            Err(Error::NoSuchVolume)
        ));
    }
}
