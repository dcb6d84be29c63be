//! Paged enumeration over the management service.
//!
//! [`Paged`] turns a repeated `enum_*` call into a lazy iterator. Each page is held in
//! a [`PageGuard`] that frees the remote buffer when the page is exhausted, when the
//! enumeration fails, or when the iterator is dropped mid-page.

use std::vec;

use crate::errors::{Result, ScopeError};
use crate::remote::{
    BufferHandle, EnumReply, InfoReply, ManagementApi, RemoteBuffer, ResumeHandle, Status,
};

/// Statuses that end an element enumeration without error.
pub const ELEMENT_END: &[Status] = &[Status::NO_MORE_ITEMS];

/// Statuses that end scope discovery without error. An unregistered endpoint is
/// reported as an empty server rather than a failure.
pub const DISCOVERY_END: &[Status] = &[Status::NO_MORE_ITEMS, Status::ENDPOINT_NOT_REGISTERED];

/// One fetched page. Releases its remote buffer exactly once, on drop.
pub struct PageGuard<'a, T> {
    api: &'a dyn ManagementApi,
    handle: Option<BufferHandle>,
    records: vec::IntoIter<T>,
}

impl<'a, T> PageGuard<'a, T> {
    /// Take ownership of `buffer`, keeping at most `read` records from it.
    pub fn new(api: &'a dyn ManagementApi, buffer: RemoteBuffer<T>, read: usize) -> Self {
        let mut records = buffer.records;
        records.truncate(read);
        Self {
            api,
            handle: Some(buffer.handle),
            records: records.into_iter(),
        }
    }
}

impl<T> Iterator for PageGuard<'_, T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        self.records.next()
    }
}

impl<T> Drop for PageGuard<'_, T> {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            log::debug!("Releasing remote buffer {}", handle.0);
            self.api.free_buffer(handle);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PagedState {
    Fetch,
    LastPage,
    Done,
}

/// Lazy, single-pass iterator over every record an `enum_*` call returns.
///
/// The next page is requested only once the current one has been drained, and the
/// current page's buffer is released before that request goes out.
pub struct Paged<'a, T, F>
where
    F: FnMut(&mut ResumeHandle) -> EnumReply<T>,
{
    api: &'a dyn ManagementApi,
    operation: &'static str,
    benign_end: &'static [Status],
    fetch: F,
    resume: ResumeHandle,
    page: Option<PageGuard<'a, T>>,
    state: PagedState,
}

impl<'a, T, F> Paged<'a, T, F>
where
    F: FnMut(&mut ResumeHandle) -> EnumReply<T>,
{
    pub fn new(
        api: &'a dyn ManagementApi,
        operation: &'static str,
        benign_end: &'static [Status],
        fetch: F,
    ) -> Self {
        Self {
            api,
            operation,
            benign_end,
            fetch,
            resume: ResumeHandle::START,
            page: None,
            state: PagedState::Fetch,
        }
    }

    fn fetch_page(&mut self) -> Result<Option<PageGuard<'a, T>>> {
        let reply = (self.fetch)(&mut self.resume);
        let read = reply.read as usize;
        // Guard first so every early return below still frees the buffer.
        let guard = reply
            .buffer
            .map(|buffer| PageGuard::new(self.api, buffer, read));

        log::debug!(
            "{}: {} record(s), status {}, resume {}",
            self.operation,
            read,
            reply.status,
            self.resume.as_raw()
        );

        if self.benign_end.contains(&reply.status) {
            self.state = PagedState::Done;
            return Ok(None);
        }

        match reply.status {
            Status::SUCCESS => self.state = PagedState::LastPage,
            Status::MORE_DATA => self.state = PagedState::Fetch,
            other => {
                self.state = PagedState::Done;
                return Err(ScopeError::remote(self.operation, other));
            }
        }

        if read == 0 {
            self.state = PagedState::Done;
            return Ok(None);
        }

        match guard {
            Some(guard) => Ok(Some(guard)),
            None => {
                log::warn!(
                    "{}: {} record(s) reported without a buffer",
                    self.operation,
                    read
                );
                self.state = PagedState::Done;
                Err(ScopeError::MalformedRecord {
                    expected: "page buffer",
                    found: "no buffer",
                })
            }
        }
    }
}

impl<T, F> Iterator for Paged<'_, T, F>
where
    F: FnMut(&mut ResumeHandle) -> EnumReply<T>,
{
    type Item = Result<T>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(page) = self.page.as_mut() {
                if let Some(record) = page.next() {
                    return Some(Ok(record));
                }
                // Drained: release before asking for more.
                self.page = None;
            }

            if self.state != PagedState::Fetch {
                self.state = PagedState::Done;
                return None;
            }

            match self.fetch_page() {
                Ok(Some(page)) => self.page = Some(page),
                Ok(None) => return None,
                Err(e) => return Some(Err(e)),
            }
        }
    }
}

/// Unwrap a single-record reply, releasing its buffer.
///
/// Statuses listed in `absent` yield `Ok(None)`; any other non-success status is a
/// [`ScopeError::RemoteCall`].
pub fn take_single<T>(
    api: &dyn ManagementApi,
    operation: &'static str,
    absent: &[Status],
    reply: InfoReply<T>,
) -> Result<Option<T>> {
    let mut guard = reply
        .buffer
        .map(|buffer| PageGuard::new(api, buffer, 1));

    if absent.contains(&reply.status) {
        return Ok(None);
    }
    if !reply.status.is_success() {
        return Err(ScopeError::remote(operation, reply.status));
    }

    Ok(guard.as_mut().and_then(|page| page.next()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::RawElement;
    use crate::options::{DhcpClass, OptionClass, OptionScope, OptionValue};
    use crate::types::{ClientInfo, ElementType, SubnetInfo};
    use std::net::Ipv4Addr;
    use std::sync::Mutex;

    /// Only buffer release is exercised here; the paged call is a closure.
    #[derive(Default)]
    struct ReleaseLog {
        freed: Mutex<Vec<u64>>,
    }

    impl ManagementApi for ReleaseLog {
        fn enum_subnets(&self, _: &str, _: &mut ResumeHandle, _: u32) -> EnumReply<Ipv4Addr> {
            unreachable!()
        }

        fn enum_subnet_elements(
            &self,
            _: &str,
            _: Ipv4Addr,
            _: ElementType,
            _: &mut ResumeHandle,
            _: u32,
        ) -> EnumReply<RawElement> {
            unreachable!()
        }

        fn enum_subnet_clients(
            &self,
            _: &str,
            _: Ipv4Addr,
            _: &mut ResumeHandle,
            _: u32,
        ) -> EnumReply<ClientInfo> {
            unreachable!()
        }

        fn enum_option_values(
            &self,
            _: &str,
            _: &OptionScope,
            _: &OptionClass,
            _: &mut ResumeHandle,
            _: u32,
        ) -> EnumReply<OptionValue> {
            unreachable!()
        }

        fn enum_classes(&self, _: &str, _: &mut ResumeHandle, _: u32) -> EnumReply<DhcpClass> {
            unreachable!()
        }

        fn get_subnet_info(&self, _: &str, _: Ipv4Addr) -> InfoReply<SubnetInfo> {
            unreachable!()
        }

        fn get_subnet_delay_offer(&self, _: &str, _: Ipv4Addr) -> (Status, u16) {
            unreachable!()
        }

        fn get_option_value(
            &self,
            _: &str,
            _: &OptionScope,
            _: &OptionClass,
            _: u32,
        ) -> InfoReply<OptionValue> {
            unreachable!()
        }

        fn free_buffer(&self, handle: BufferHandle) {
            self.freed.lock().unwrap().push(handle.0);
        }
    }

    fn page(handle: u64, status: Status, records: Vec<u32>) -> EnumReply<u32> {
        let read = records.len() as u32;
        EnumReply {
            status,
            buffer: Some(RemoteBuffer {
                handle: BufferHandle(handle),
                records,
            }),
            read,
            total: 0,
        }
    }

    #[test]
    fn test_paged_walks_pages_in_order() {
        let api = ReleaseLog::default();
        let mut calls = 0;
        let items: Vec<u32> = Paged::new(&api, "test", ELEMENT_END, |resume| {
            calls += 1;
            *resume = ResumeHandle::from_raw(calls);
            match calls {
                1 => page(1, Status::MORE_DATA, vec![1, 2]),
                2 => page(2, Status::MORE_DATA, vec![3]),
                _ => page(3, Status::SUCCESS, vec![4, 5]),
            }
        })
        .collect::<Result<_>>()
        .unwrap();

        assert_eq!(items, vec![1, 2, 3, 4, 5]);
        assert_eq!(*api.freed.lock().unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn test_paged_passes_resume_handle_back() {
        let api = ReleaseLog::default();
        let mut seen = Vec::new();
        let count = Paged::new(&api, "test", ELEMENT_END, |resume| {
            seen.push(resume.as_raw());
            let next = resume.as_raw() + 10;
            *resume = ResumeHandle::from_raw(next);
            if next < 30 {
                page(next as u64, Status::MORE_DATA, vec![next])
            } else {
                EnumReply::status(Status::NO_MORE_ITEMS)
            }
        })
        .count();

        assert_eq!(count, 2);
        assert_eq!(seen, vec![0, 10, 20]);
    }

    #[test]
    fn test_paged_truncates_to_read_count() {
        let api = ReleaseLog::default();
        let mut reply = Some(page(7, Status::SUCCESS, vec![1, 2, 3]));
        let items: Vec<u32> = Paged::new(&api, "test", ELEMENT_END, |_| {
            let mut r = reply.take().unwrap();
            r.read = 2;
            r
        })
        .collect::<Result<_>>()
        .unwrap();

        assert_eq!(items, vec![1, 2]);
        assert_eq!(*api.freed.lock().unwrap(), vec![7]);
    }

    #[test]
    fn test_paged_zero_count_stops_and_releases() {
        let api = ReleaseLog::default();
        let mut calls = 0;
        let items: Vec<u32> = Paged::new(&api, "test", ELEMENT_END, |_| {
            calls += 1;
            page(9, Status::MORE_DATA, vec![])
        })
        .collect::<Result<_>>()
        .unwrap();

        assert!(items.is_empty());
        assert_eq!(calls, 1);
        assert_eq!(*api.freed.lock().unwrap(), vec![9]);
    }

    #[test]
    fn test_paged_error_releases_buffer() {
        let api = ReleaseLog::default();
        let mut iter = Paged::new(&api, "EnumThings", ELEMENT_END, |_| {
            page(4, Status(5), vec![1])
        });

        let err = iter.next().unwrap().unwrap_err();
        assert_eq!(
            err,
            ScopeError::RemoteCall {
                operation: "EnumThings",
                code: Status(5)
            }
        );
        assert!(iter.next().is_none());
        assert_eq!(*api.freed.lock().unwrap(), vec![4]);
    }

    #[test]
    fn test_paged_count_without_buffer_is_malformed() {
        let api = ReleaseLog::default();
        let mut calls = 0;
        let mut iter = Paged::new(&api, "EnumThings", ELEMENT_END, |_| {
            calls += 1;
            EnumReply::<u32> {
                status: Status::MORE_DATA,
                buffer: None,
                read: 3,
                total: 0,
            }
        });

        assert!(matches!(
            iter.next(),
            Some(Err(ScopeError::MalformedRecord {
                expected: "page buffer",
                ..
            }))
        ));
        assert!(iter.next().is_none());
        drop(iter);
        assert_eq!(calls, 1);
        assert!(api.freed.lock().unwrap().is_empty());
    }

    #[test]
    fn test_take_single_absent_releases() {
        let api = ReleaseLog::default();
        let reply = InfoReply {
            status: Status::OPTION_NOT_PRESENT,
            buffer: Some(RemoteBuffer {
                handle: BufferHandle(11),
                records: vec![1u32],
            }),
        };

        let value = take_single(&api, "GetThing", &[Status::OPTION_NOT_PRESENT], reply).unwrap();
        assert_eq!(value, None);
        assert_eq!(*api.freed.lock().unwrap(), vec![11]);
    }

    #[test]
    fn test_take_single_success() {
        let api = ReleaseLog::default();
        let reply = InfoReply {
            status: Status::SUCCESS,
            buffer: Some(RemoteBuffer {
                handle: BufferHandle(12),
                records: vec![42u32],
            }),
        };

        assert_eq!(take_single(&api, "GetThing", &[], reply).unwrap(), Some(42));
        assert_eq!(*api.freed.lock().unwrap(), vec![12]);
    }
}
