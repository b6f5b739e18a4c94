// Copyright (C) 2017-2018 Red Hat, Inc.
//
// Permission is hereby granted, free of charge, to any
// person obtaining a copy of this software and associated
// documentation files (the "Software"), to deal in the
// Software without restriction, including without
// limitation the rights to use, copy, modify, merge,
// publish, distribute, sublicense, and/or sell copies of
// the Software, and to permit persons to whom the Software
// is furnished to do so, subject to the following
// conditions:
//
// The above copyright notice and this permission notice
// shall be included in all copies or substantial portions
// of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF
// ANY KIND, EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED
// TO THE WARRANTIES OF MERCHANTABILITY, FITNESS FOR A
// PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT
// SHALL THE AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY
// CLAIM, DAMAGES OR OTHER LIABILITY, WHETHER IN AN ACTION
// OF CONTRACT, TORT OR OTHERWISE, ARISING FROM, OUT OF OR
// IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER
// DEALINGS IN THE SOFTWARE.

use std::collections::{BTreeSet, HashMap};
use std::fmt;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;

use super::client::Client;
use super::error::*;
use super::misc::{normalize_wwn, verify_port_id};
use super::reconcile::Membership;
use super::sync::{MembershipResource, SetResource};
use super::transport::Transport;

const HOST_GROUP_PATH: &str = "/ConfigurationManager/v1/objects/host-groups";
const LUN_PATH: &str = "/ConfigurationManager/v1/objects/luns";
const HOST_WWN_PATH: &str = "/ConfigurationManager/v1/objects/host-wwns";

#[derive(Deserialize, Debug)]
struct DataList<T> {
    data: Vec<T>,
}

fn get_list<T: Transport, O: DeserializeOwned>(
    client: &Client<'_, T>,
    path: &str,
) -> Result<Vec<O>> {
    let list: DataList<O> = serde_json::from_value(client.get(path)?)?;
    Ok(list.data)
}

/// A host group, addressed by port and host group number.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HostGroupRef {
    pub port_id: String,
    pub number: u32,
}

impl HostGroupRef {
    pub fn new(port_id: &str, number: u32) -> Result<HostGroupRef> {
        verify_port_id(port_id)?;
        Ok(HostGroupRef {
            port_id: port_id.to_uppercase(),
            number,
        })
    }

    fn query(&self) -> String {
        format!("portId={}&hostGroupNumber={}", self.port_id, self.number)
    }
}

impl fmt::Display for HostGroupRef {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{},{}", self.port_id, self.number)
    }
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct HostGroupEntry {
    port_id: String,
    host_group_number: u32,
    host_group_name: String,
}

/// Host groups per port: port id to host-group names.
pub struct HostGroups<'c, T: Transport> {
    client: &'c Client<'c, T>,
    ports: BTreeSet<String>,
    numbers: HashMap<(String, String), u32>,
}

impl<'c, T: Transport> HostGroups<'c, T> {
    /// Manage host groups on `ports`. Host groups on other ports are
    /// neither observed nor touched.
    pub fn new<I, S>(client: &'c Client<'c, T>, ports: I) -> Result<HostGroups<'c, T>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut port_set = BTreeSet::new();
        for p in ports {
            verify_port_id(p.as_ref())?;
            port_set.insert(p.as_ref().to_uppercase());
        }
        Ok(HostGroups {
            client,
            ports: port_set,
            numbers: HashMap::new(),
        })
    }

    /// Manage the ports named in `desired`.
    pub fn for_membership(
        client: &'c Client<'c, T>,
        desired: &Membership<String, String>,
    ) -> Result<HostGroups<'c, T>> {
        HostGroups::new(client, desired.keys())
    }

    /// Validate and upper-case the port ids of user supplied membership.
    /// Entries whose ports only differ in case are merged.
    pub fn desired(desired: &Membership<String, String>) -> Result<Membership<String, String>> {
        let mut ret = Membership::new();
        for (port, names) in desired {
            verify_port_id(port)?;
            ret.entry(port.to_uppercase())
                .or_insert_with(BTreeSet::new)
                .extend(names.iter().cloned());
        }
        Ok(ret)
    }
}

impl<T: Transport> MembershipResource for HostGroups<'_, T> {
    type Key = String;
    type Member = String;

    fn kind(&self) -> &'static str {
        "host group"
    }

    fn normalize(&self, desired: &Membership<String, String>) -> Result<Membership<String, String>> {
        Self::desired(desired)
    }

    fn observe(&mut self) -> Result<Membership<String, String>> {
        let mut ret = Membership::new();
        self.numbers.clear();
        for port in &self.ports {
            let path = format!("{}?portId={}", HOST_GROUP_PATH, port);
            let entries: Vec<HostGroupEntry> = get_list(self.client, &path)?;
            let names = ret.entry(port.clone()).or_insert_with(BTreeSet::new);
            for e in entries {
                names.insert(e.host_group_name.clone());
                self.numbers.insert(
                    (e.port_id.to_uppercase(), e.host_group_name),
                    e.host_group_number,
                );
            }
        }
        Ok(ret)
    }

    fn add(&mut self, port: &String, name: &String) -> Result<()> {
        self.client.post(
            HOST_GROUP_PATH,
            &json!({"portId": port, "hostGroupName": name}),
        )?;
        Ok(())
    }

    fn remove(&mut self, port: &String, name: &String) -> Result<()> {
        let number = match self.numbers.get(&(port.clone(), name.clone())) {
            Some(n) => *n,
            None => {
                return Err(ArrayError::NotFound(format!(
                    "Host group '{}' not found on port {}",
                    name, port
                )))
            }
        };
        self.client
            .delete(&format!("{}/{},{}", HOST_GROUP_PATH, port, number))?;
        self.numbers.remove(&(port.clone(), name.clone()));
        Ok(())
    }
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct LunEntry {
    lun: u32,
    ldev_id: u32,
}

/// LDEVs mapped to one host group, as a set of LDEV ids.
pub struct LunPaths<'c, T: Transport> {
    client: &'c Client<'c, T>,
    host_group: HostGroupRef,
    luns: HashMap<u32, u32>,
}

impl<'c, T: Transport> LunPaths<'c, T> {
    pub fn new(client: &'c Client<'c, T>, host_group: HostGroupRef) -> LunPaths<'c, T> {
        LunPaths {
            client,
            host_group,
            luns: HashMap::new(),
        }
    }
}

impl<T: Transport> SetResource for LunPaths<'_, T> {
    type Member = u32;

    fn kind(&self) -> &'static str {
        "LUN path"
    }

    fn scope(&self) -> String {
        self.host_group.to_string()
    }

    fn observe(&mut self) -> Result<BTreeSet<u32>> {
        let path = format!("{}?{}", LUN_PATH, self.host_group.query());
        let entries: Vec<LunEntry> = get_list(self.client, &path)?;
        self.luns = entries.iter().map(|e| (e.ldev_id, e.lun)).collect();
        Ok(entries.into_iter().map(|e| e.ldev_id).collect())
    }

    fn add(&mut self, ldev_id: &u32) -> Result<()> {
        self.client.post(
            LUN_PATH,
            &json!({
                "portId": self.host_group.port_id,
                "hostGroupNumber": self.host_group.number,
                "ldevId": ldev_id,
            }),
        )?;
        Ok(())
    }

    fn remove(&mut self, ldev_id: &u32) -> Result<()> {
        let lun = match self.luns.get(ldev_id) {
            Some(l) => *l,
            None => {
                return Err(ArrayError::NotFound(format!(
                    "LDEV {} is not mapped to host group {}",
                    ldev_id, self.host_group
                )))
            }
        };
        self.client
            .delete(&format!("{}/{},{}", LUN_PATH, self.host_group, lun))?;
        self.luns.remove(ldev_id);
        Ok(())
    }
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct HostWwnEntry {
    host_wwn: String,
}

/// Initiator WWNs registered to one host group.
pub struct HostWwns<'c, T: Transport> {
    client: &'c Client<'c, T>,
    host_group: HostGroupRef,
}

impl<'c, T: Transport> HostWwns<'c, T> {
    pub fn new(client: &'c Client<'c, T>, host_group: HostGroupRef) -> HostWwns<'c, T> {
        HostWwns { client, host_group }
    }

    /// Normalize user supplied WWNs into the desired member set.
    pub fn desired<I, S>(wwns: I) -> Result<BTreeSet<String>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        wwns.into_iter().map(|w| normalize_wwn(w.as_ref())).collect()
    }
}

impl<T: Transport> SetResource for HostWwns<'_, T> {
    type Member = String;

    fn kind(&self) -> &'static str {
        "host WWN"
    }

    fn scope(&self) -> String {
        self.host_group.to_string()
    }

    fn observe(&mut self) -> Result<BTreeSet<String>> {
        let path = format!("{}?{}", HOST_WWN_PATH, self.host_group.query());
        let entries: Vec<HostWwnEntry> = get_list(self.client, &path)?;
        entries
            .into_iter()
            .map(|e| normalize_wwn(&e.host_wwn))
            .collect()
    }

    fn add(&mut self, wwn: &String) -> Result<()> {
        self.client.post(
            HOST_WWN_PATH,
            &json!({
                "hostWwn": wwn,
                "portId": self.host_group.port_id,
                "hostGroupNumber": self.host_group.number,
            }),
        )?;
        Ok(())
    }

    fn remove(&mut self, wwn: &String) -> Result<()> {
        self.client
            .delete(&format!("{}/{},{}", HOST_WWN_PATH, self.host_group, wwn))?;
        Ok(())
    }
}
