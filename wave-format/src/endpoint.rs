use windows::Win32::{
    Foundation::RPC_E_CHANGED_MODE,
    Media::Audio::{
        eConsole, eRender, IAudioClient, IMMDevice, IMMDeviceEnumerator, MMDeviceEnumerator,
    },
    System::Com::{
        CoCreateInstance, CoInitializeEx, CoUninitialize, CLSCTX_ALL, COINIT_MULTITHREADED,
    },
};

use crate::{mem::CoTaskMem, AudioFormatDescriptor, Result};

/// Keeps COM initialized on the current thread for as long as it lives.
pub struct ComApartment {
    owned: bool,
}

impl ComApartment {
    pub fn init() -> Result<Self> {
        match unsafe { CoInitializeEx(None, COINIT_MULTITHREADED) } {
            Ok(()) => Ok(Self { owned: true }),
            Err(e) if e.code() == RPC_E_CHANGED_MODE => {
                // Someone else already set up a different apartment model on this thread.
                tracing::debug!("COM already initialized with another concurrency model");
                Ok(Self { owned: false })
            }
            Err(e) => Err(e.into()),
        }
    }
}

impl Drop for ComApartment {
    fn drop(&mut self) {
        if self.owned {
            unsafe { CoUninitialize() };
        }
    }
}

/// The default render device for the console role, resolved at `open` time.
pub struct DefaultRenderEndpoint {
    device: IMMDevice,
}

impl DefaultRenderEndpoint {
    pub fn open() -> Result<Self> {
        let device = unsafe {
            let enumerator: IMMDeviceEnumerator =
                CoCreateInstance(&MMDeviceEnumerator, None, CLSCTX_ALL)?;
            enumerator.GetDefaultAudioEndpoint(eRender, eConsole)?
        };

        Ok(Self { device })
    }

    pub fn id(&self) -> Result<String> {
        unsafe {
            let id = self.device.GetId()?;
            let _owner = CoTaskMem::from_raw(id.0);
            Ok(String::from_utf16_lossy(id.as_wide()))
        }
    }

    /// Reads the shared-mode mix format of the device.
    pub fn mix_format(&self) -> Result<AudioFormatDescriptor> {
        let format = unsafe {
            let client: IAudioClient = self.device.Activate(CLSCTX_ALL, None)?;
            CoTaskMem::from_raw(client.GetMixFormat()?)
        };

        unsafe { AudioFormatDescriptor::from_ptr(format.as_ptr() as *const u8) }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    #[ignore]
    fn test_default_render_mix_format() {
        let _com = ComApartment::init().unwrap();

        let endpoint = DefaultRenderEndpoint::open().unwrap();
        let fmt = endpoint.mix_format().unwrap();
        println!("{}: {}", endpoint.id().unwrap(), fmt);

        assert!(fmt.channel_count >= 1);
        assert!(fmt.sample_rate > 0);
    }
}
