use windows::Win32::System::Com::CoTaskMemFree;

/// Owns a block allocated by the COM task allocator and frees it on drop.
///
/// Used for out-parameters such as the `WAVEFORMATEX` returned by
/// `IAudioClient::GetMixFormat` and the id string from `IMMDevice::GetId`.
pub struct CoTaskMem<T> {
    ptr: *mut T,
}

impl<T> CoTaskMem<T> {
    /// # Safety
    /// `ptr` must be null or have been allocated with `CoTaskMemAlloc`, and
    /// nothing else may free it.
    pub unsafe fn from_raw(ptr: *mut T) -> Self {
        Self { ptr }
    }

    pub fn as_ptr(&self) -> *const T {
        self.ptr
    }
}

impl<T> Drop for CoTaskMem<T> {
    fn drop(&mut self) {
        if self.ptr.is_null() {
            return;
        }

        tracing::trace!(ptr = ?self.ptr, "CoTaskMemFree");
        unsafe {
            CoTaskMemFree(Some(self.ptr as *const _));
        }
    }
}
